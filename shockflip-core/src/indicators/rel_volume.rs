//! Relative volume: volume_t / mean(volume over the preceding `period` bars).
//!
//! Undefined during warm-up and when the preceding mean is zero.

use super::{Indicator, RollingWindow};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct RelativeVolume {
    period: usize,
    name: String,
    prior: RollingWindow,
}

impl RelativeVolume {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "relative volume period must be >= 1");
        Self {
            period,
            name: format!("rel_volume_{period}"),
            prior: RollingWindow::new(period),
        }
    }
}

impl Indicator for RelativeVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let value = if self.prior.is_full() {
            self.prior
                .mean()
                .filter(|m| *m > 0.0)
                .map(|m| bar.volume / m)
        } else {
            None
        };
        self.prior.push(bar.volume);
        value
    }

    fn reset(&mut self) {
        self.prior.clear();
    }
}
