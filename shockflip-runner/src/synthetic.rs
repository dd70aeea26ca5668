//! Synthetic bar generation for development and tests.
//!
//! A seeded random walk with noisy two-sided aggressor flow. Now and then a
//! short one-sided burst pushes price in the direction of the dominant
//! aggressor, which is the pattern the detector looks for. Same spec, same
//! bars, on every platform.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shockflip_core::domain::Bar;
use shockflip_core::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSpec {
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    pub start: DateTime<Utc>,
    pub bar_minutes: i64,
    /// Chance per bar that a one-sided burst begins.
    pub shock_probability: f64,
    pub shock_bars: usize,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            bars: 20_000,
            seed: 42,
            start_price: 100.0,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            bar_minutes: 1,
            shock_probability: 0.004,
            shock_bars: 3,
        }
    }
}

impl SyntheticSpec {
    pub fn validate(&self) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&self.shock_probability) {
            return Err(CoreError::invalid(
                "data.shock_probability",
                "must be in [0, 1]",
            ));
        }
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(CoreError::invalid("data.start_price", "must be finite and > 0"));
        }
        if self.bar_minutes < 1 {
            return Err(CoreError::invalid("data.bar_minutes", "must be >= 1"));
        }
        Ok(())
    }

    /// Burst chance usable by `gen_bool`; NaN counts as no bursts.
    fn burst_probability(&self) -> f64 {
        if self.shock_probability.is_nan() {
            0.0
        } else {
            self.shock_probability.clamp(0.0, 1.0)
        }
    }
}

/// Generate `spec.bars` bars. Deterministic in the spec.
///
/// Out-of-range fields are clamped; call `validate` first to reject them.
pub fn generate_bars(spec: &SyntheticSpec) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut bars = Vec::with_capacity(spec.bars);
    let mut price = spec.start_price.max(1.0);
    let burst_probability = spec.burst_probability();
    let bar_minutes = spec.bar_minutes.max(1);
    // remaining burst bars and the burst's buy share
    let mut burst: Option<(usize, f64)> = None;

    for i in 0..spec.bars {
        if burst.is_none() && rng.gen_bool(burst_probability) {
            let share = if rng.gen_bool(0.5) { 0.93 } else { 0.07 };
            burst = Some((spec.shock_bars.max(1), share));
        }

        let (buy_share, drift, volume_mult) = match burst {
            Some((left, share)) => {
                burst = (left > 1).then_some((left - 1, share));
                let direction = if share > 0.5 { 1.0 } else { -1.0 };
                (share, direction * rng.gen_range(0.001..0.003), 3.0)
            }
            None => (rng.gen_range(0.42..0.58), 0.0, 1.0),
        };

        let ret: f64 = drift + rng.gen_range(-0.0012..0.0012);
        let open = price;
        let close = (open * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0008));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0008));
        let volume = rng.gen_range(50.0..150.0) * volume_mult;
        let buy_volume = volume * buy_share;
        let sell_volume = volume - buy_volume;

        let open_time = spec.start + Duration::minutes(bar_minutes * i as i64);
        bars.push(Bar {
            open_time,
            close_time: open_time + Duration::minutes(bar_minutes),
            open,
            high,
            low,
            close,
            buy_volume,
            sell_volume,
            volume,
        });
        price = close;
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use shockflip_core::domain::validate_bars;

    fn spec(bars: usize, seed: u64) -> SyntheticSpec {
        SyntheticSpec {
            bars,
            seed,
            ..SyntheticSpec::default()
        }
    }

    #[test]
    fn same_seed_same_bars() {
        assert_eq!(generate_bars(&spec(500, 7)), generate_bars(&spec(500, 7)));
        assert_ne!(generate_bars(&spec(500, 7)), generate_bars(&spec(500, 8)));
    }

    #[test]
    fn bars_are_valid() {
        let bars = generate_bars(&spec(5_000, 1));
        assert_eq!(bars.len(), 5_000);
        validate_bars(&bars).unwrap();
        for b in &bars {
            assert!(b.high >= b.open.max(b.close));
            assert!(b.low <= b.open.min(b.close));
            assert!((b.buy_volume + b.sell_volume - b.volume).abs() < 1e-9);
        }
    }

    #[test]
    fn bursts_are_one_sided() {
        let s = SyntheticSpec {
            shock_probability: 0.05,
            ..spec(2_000, 3)
        };
        let bars = generate_bars(&s);
        let one_sided = bars.iter().filter(|b| b.imbalance().abs() > 0.8).count();
        assert!(one_sided > 0);
    }

    #[test]
    fn zero_bars() {
        assert!(generate_bars(&spec(0, 1)).is_empty());
    }

    #[test]
    fn validate_rejects_bad_fields() {
        assert!(SyntheticSpec::default().validate().is_ok());
        for s in [
            SyntheticSpec { shock_probability: f64::NAN, ..spec(10, 1) },
            SyntheticSpec { shock_probability: 1.5, ..spec(10, 1) },
            SyntheticSpec { start_price: 0.0, ..spec(10, 1) },
            SyntheticSpec { bar_minutes: 0, ..spec(10, 1) },
        ] {
            assert!(matches!(s.validate(), Err(CoreError::InvalidConfiguration { .. })));
        }
    }

    #[test]
    fn nan_probability_does_not_panic() {
        let s = SyntheticSpec {
            shock_probability: f64::NAN,
            ..spec(200, 5)
        };
        let bars = generate_bars(&s);
        assert_eq!(bars.len(), 200);
        assert!(bars.iter().all(|b| b.imbalance().abs() < 0.2));
    }
}
