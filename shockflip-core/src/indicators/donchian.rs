//! Donchian channel over the bars *preceding* the current one.
//!
//! - Upper at t: max(high[t-period..t])
//! - Lower at t: min(low[t-period..t])
//!
//! The current bar is excluded, so "close_t ≤ lower_t" reads as "this bar
//! closed at a new `period`-bar low". Lookback: period.

use super::{Indicator, RollingWindow};
use crate::domain::Bar;

/// Which band of the Donchian channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
    prior: RollingWindow,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        Self::with_band(period, DonchianBand::Upper)
    }

    pub fn lower(period: usize) -> Self {
        Self::with_band(period, DonchianBand::Lower)
    }

    fn with_band(period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        let prefix = match band {
            DonchianBand::Upper => "donchian_upper",
            DonchianBand::Lower => "donchian_lower",
        };
        Self {
            period,
            band,
            name: format!("{prefix}_{period}"),
            prior: RollingWindow::new(period),
        }
    }

    pub fn band(&self) -> DonchianBand {
        self.band
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let value = if self.prior.is_full() {
            match self.band {
                DonchianBand::Upper => self.prior.max(),
                DonchianBand::Lower => self.prior.min(),
            }
        } else {
            None
        };
        self.prior.push(match self.band {
            DonchianBand::Upper => bar.high,
            DonchianBand::Lower => bar.low,
        });
        value
    }

    fn reset(&mut self) {
        self.prior.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    fn sample() -> Vec<Bar> {
        make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.0, 13.0, 13.5),
            (13.5, 16.0, 12.0, 15.0),
            (15.0, 15.5, 14.0, 14.5),
        ])
    }

    #[test]
    fn donchian_upper_3() {
        let result = Donchian::upper(3).compute(&sample());
        assert!(result[..3].iter().all(Option::is_none));
        // [3] = max(12, 15, 14) = 15
        assert_approx(result[3].unwrap(), 15.0, DEFAULT_EPSILON);
        // [4] = max(15, 14, 16) = 16
        assert_approx(result[4].unwrap(), 16.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_lower_3() {
        let result = Donchian::lower(3).compute(&sample());
        assert!(result[2].is_none());
        // [3] = min(9, 10, 13) = 9
        assert_approx(result[3].unwrap(), 9.0, DEFAULT_EPSILON);
        // [4] = min(10, 13, 12) = 10
        assert_approx(result[4].unwrap(), 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn current_bar_is_excluded() {
        // the last bar's own low (1.0) must not appear in its channel value
        let bars = make_ohlc_bars(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 11.0, 1.0, 2.0),
        ]);
        let result = Donchian::lower(2).compute(&bars);
        assert_eq!(result[2], Some(9.0));
    }

    #[test]
    fn donchian_lookback() {
        assert_eq!(Donchian::upper(20).lookback(), 20);
        assert_eq!(Donchian::lower(1).lookback(), 1);
        assert_eq!(Donchian::lower(5).band(), DonchianBand::Lower);
    }
}
