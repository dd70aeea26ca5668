//! Causal rolling indicators.
//!
//! Every indicator is a small state machine fed one bar at a time. The value
//! returned for bar t depends on bars 0..=t only, and is `None` until the
//! indicator's own window is full. The batch `compute` is just the streaming
//! update replayed from a clean state, so both paths agree by construction.

pub mod atr;
pub mod donchian;
pub mod percentile;
pub mod rel_volume;
pub mod rolling;
pub mod zscore;

pub use atr::{true_range, Atr};
pub use donchian::{Donchian, DonchianBand};
pub use percentile::{percentile_linear, RollingPercentile};
pub use rel_volume::RelativeVolume;
pub use rolling::RollingWindow;
pub use zscore::{FlowZScore, RollingZScore};

use crate::domain::Bar;

/// Trait for streaming indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Every indicator must
/// pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_60", "imbalance_z_240").
    fn name(&self) -> &str;

    /// Index of the first bar with a defined value.
    fn lookback(&self) -> usize;

    /// Feed the next bar and return its value.
    fn update(&mut self, bar: &Bar) -> Option<f64>;

    /// Forget all history.
    fn reset(&mut self);

    /// Replay a whole series from a clean state.
    fn compute(&mut self, bars: &[Bar]) -> Vec<Option<f64>> {
        self.reset();
        bars.iter().map(|b| self.update(b)).collect()
    }
}

/// Build bars from `(close, buy_volume, sell_volume)` tuples for tests.
///
/// open = previous close, high/low = ±0.5 around the body, volume = Q+ + Q−.
#[cfg(test)]
pub fn make_flow_bars(data: &[(f64, f64, f64)]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(close, buy, sell))| {
            let open = if i == 0 { close } else { data[i - 1].0 };
            let open_time = base + chrono::Duration::minutes(i as i64);
            Bar {
                open_time,
                close_time: open_time + chrono::Duration::minutes(1),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                buy_volume: buy,
                sell_volume: sell,
                volume: buy + sell,
            }
        })
        .collect()
}

/// Build bars from `(open, high, low, close)` tuples with balanced flow.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            let open_time = base + chrono::Duration::minutes(i as i64);
            Bar {
                open_time,
                close_time: open_time + chrono::Duration::minutes(1),
                open,
                high,
                low,
                close,
                buy_volume: 50.0,
                sell_volume: 50.0,
                volume: 100.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
