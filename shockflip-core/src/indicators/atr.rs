//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|);
//! TR[0] = high[0] - low[0].
//! ATR is the simple mean of the last `period` true ranges (no Wilder smoothing).
//! Lookback: period - 1.

use super::{Indicator, RollingWindow};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    tr: RollingWindow,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
            prev_close: None,
            tr: RollingWindow::new(period),
        }
    }
}

/// True range of one bar given the previous close.
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let hl = bar.high - bar.low;
    match prev_close {
        None => hl,
        Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.tr.push(true_range(bar, self.prev_close));
        self.prev_close = Some(bar.close);
        if self.tr.is_full() {
            self.tr.mean()
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.tr.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        assert_approx(true_range(&bars[0], None), 10.0, DEFAULT_EPSILON);
        assert_approx(true_range(&bars[1], Some(bars[0].close)), 8.0, DEFAULT_EPSILON);
        assert_approx(true_range(&bars[2], Some(bars[1].close)), 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        // Gap up: prev close 100, current bar 110-115-108
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        assert_approx(true_range(&bars[1], Some(100.0)), 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let mut atr = Atr::new(3);
        let result = atr.compute(&bars);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 9.0, DEFAULT_EPSILON); // (10+8+9)/3
        assert_approx(result[3].unwrap(), 23.0 / 3.0, DEFAULT_EPSILON); // (8+9+6)/3
        assert_approx(result[4].unwrap(), 7.0, DEFAULT_EPSILON); // (9+6+6)/3
    }

    #[test]
    fn compute_resets_state() {
        let bars = make_ohlc_bars(&[(100.0, 101.0, 99.0, 100.0), (100.0, 102.0, 99.0, 101.0)]);
        let mut atr = Atr::new(2);
        let first = atr.compute(&bars);
        let second = atr.compute(&bars);
        assert_eq!(first, second);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 13);
    }
}
