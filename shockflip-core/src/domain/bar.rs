//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One aggregated OHLC bar with aggressor-split volume.
///
/// `buy_volume` is volume traded by buyer-initiated (aggressor) orders, Q+;
/// `sell_volume` is seller-initiated, Q−. `volume` is the total and may
/// exceed `buy_volume + sell_volume` when some prints are unclassified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub volume: f64,
}

/// Guard added to the imbalance denominator.
pub const IMBALANCE_EPS: f64 = 1e-9;

impl Bar {
    /// Net aggressor flow, Q+ − Q−.
    pub fn delta(&self) -> f64 {
        self.buy_volume - self.sell_volume
    }

    /// Order-flow imbalance in [-1, 1]; 0 when no aggressor volume traded.
    pub fn imbalance(&self) -> f64 {
        self.delta() / (self.buy_volume + self.sell_volume + IMBALANCE_EPS)
    }

    /// Returns true if any price or volume field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.buy_volume,
            self.sell_volume,
            self.volume,
        ]
        .iter()
        .any(|v| !v.is_finite())
    }

    /// Basic sanity check: finite fields, high >= low, non-negative volumes.
    pub fn is_sane(&self) -> bool {
        self.check(0).is_ok()
    }

    /// Validate a single bar, reporting the first problem found.
    pub fn check(&self, index: usize) -> CoreResult<()> {
        if self.is_void() {
            return Err(CoreError::malformed(index, "non-finite price or volume"));
        }
        if self.high < self.low {
            return Err(CoreError::malformed(
                index,
                format!("high {} below low {}", self.high, self.low),
            ));
        }
        if self.buy_volume < 0.0 || self.sell_volume < 0.0 || self.volume < 0.0 {
            return Err(CoreError::malformed(index, "negative volume"));
        }
        if self.close_time < self.open_time {
            return Err(CoreError::malformed(index, "close_time before open_time"));
        }
        Ok(())
    }
}

/// Validate a whole bar sequence: every bar sane, open times strictly increasing.
pub fn validate_bars(bars: &[Bar]) -> CoreResult<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.check(i)?;
        if i > 0 && bar.open_time <= bars[i - 1].open_time {
            return Err(CoreError::malformed(i, "timestamps not strictly increasing"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Bar {
            open_time: t,
            close_time: t + chrono::Duration::minutes(1),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            buy_volume: 60.0,
            sell_volume: 40.0,
            volume: 100.0,
        }
    }

    #[test]
    fn imbalance_is_bounded() {
        let bar = sample_bar();
        assert!((bar.imbalance() - 0.2).abs() < 1e-9);
        assert_eq!(bar.delta(), 20.0);
    }

    #[test]
    fn zero_flow_gives_zero_imbalance() {
        let mut bar = sample_bar();
        bar.buy_volume = 0.0;
        bar.sell_volume = 0.0;
        assert_eq!(bar.imbalance(), 0.0);
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn negative_volume_is_malformed() {
        let mut bar = sample_bar();
        bar.sell_volume = -1.0;
        assert_eq!(
            bar.check(3),
            Err(CoreError::malformed(3, "negative volume"))
        );
    }

    #[test]
    fn validate_rejects_repeated_timestamp() {
        let a = sample_bar();
        let b = sample_bar();
        let err = validate_bars(&[a, b]).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { index: 1, .. }));
    }

    #[test]
    fn validate_accepts_increasing_sequence() {
        let a = sample_bar();
        let mut b = sample_bar();
        b.open_time = a.close_time;
        b.close_time = b.open_time + chrono::Duration::minutes(1);
        assert!(validate_bars(&[a, b]).is_ok());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
