//! Rolling z-score.
//!
//! z_t = (x_t − mean(x, window)) / std(x, window), population std, window
//! including x_t. Defined once the window is full. A window whose std falls
//! below `MIN_STD` yields z = 0 rather than ±inf.

use super::{Indicator, RollingWindow};
use crate::config::FlowSource;
use crate::domain::Bar;

/// Standard deviations below this are treated as zero variance.
pub const MIN_STD: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct RollingZScore {
    window: RollingWindow,
}

impl RollingZScore {
    pub fn new(window: usize) -> Self {
        Self {
            window: RollingWindow::new(window),
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        self.window.push(x);
        if !self.window.is_full() {
            return None;
        }
        let mean = self.window.mean()?;
        let std = self.window.population_std()?;
        if std < MIN_STD {
            Some(0.0)
        } else {
            Some((x - mean) / std)
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn period(&self) -> usize {
        self.window.capacity()
    }
}

/// Z-score of one order-flow series (imbalance or delta).
#[derive(Debug, Clone)]
pub struct FlowZScore {
    inner: RollingZScore,
    source: FlowSource,
    name: String,
}

impl FlowZScore {
    pub fn new(window: usize, source: FlowSource) -> Self {
        assert!(window >= 2, "z-score window must be >= 2");
        let prefix = match source {
            FlowSource::Imbalance => "imbalance_z",
            FlowSource::Delta => "delta_z",
        };
        Self {
            inner: RollingZScore::new(window),
            source,
            name: format!("{prefix}_{window}"),
        }
    }

    pub fn source(&self) -> FlowSource {
        self.source
    }
}

impl Indicator for FlowZScore {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.inner.period() - 1
    }

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.inner.update(self.source.value(bar))
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
