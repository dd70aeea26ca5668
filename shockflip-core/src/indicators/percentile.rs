//! Rolling percentile with linear interpolation between order statistics.

use super::RollingWindow;

/// Linear-interpolated percentile of `values` (q in [0, 1]).
///
/// Position `q × (n − 1)` in the sorted sample, interpolated between the two
/// neighbouring order statistics. Returns `None` for an empty sample.
pub fn percentile_linear(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    interpolate_sorted(&sorted, q)
}

fn interpolate_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Rolling percentile over the last `window` samples.
///
/// Keeps the window in arrival order for eviction and a sorted copy for the
/// order statistics; each update is two binary searches and one shift.
#[derive(Debug, Clone)]
pub struct RollingPercentile {
    window: RollingWindow,
    sorted: Vec<f64>,
    min_periods: usize,
    q: f64,
}

impl RollingPercentile {
    pub fn new(window: usize, min_periods: usize, q: f64) -> Self {
        Self {
            window: RollingWindow::new(window),
            sorted: Vec::with_capacity(window),
            min_periods,
            q,
        }
    }

    /// Push a sample and return the percentile of the window including it.
    pub fn update(&mut self, x: f64) -> Option<f64> {
        if let Some(old) = self.window.push(x) {
            let at = self.sorted.partition_point(|v| v.total_cmp(&old).is_lt());
            self.sorted.remove(at);
        }
        let at = self.sorted.partition_point(|v| v.total_cmp(&x).is_le());
        self.sorted.insert(at, x);
        self.current()
    }

    /// Percentile of the current window without pushing a new sample.
    pub fn current(&self) -> Option<f64> {
        if self.sorted.len() < self.min_periods {
            return None;
        }
        interpolate_sorted(&self.sorted, self.q)
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.sorted.clear();
    }
}
