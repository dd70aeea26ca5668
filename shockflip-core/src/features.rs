//! FeatureEngine — per-bar causal feature vectors.
//!
//! Owns one instance of every rolling indicator plus the dynamic threshold
//! tracker. `push` consumes the next bar in order and returns that bar's
//! `FeatureVector`; there is no way to revise a bar once pushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FeatureConfig, FlowSource, ThresholdPolicy};
use crate::domain::Bar;
use crate::error::{CoreError, CoreResult};
use crate::indicators::{Atr, Donchian, FlowZScore, Indicator, RelativeVolume, RollingPercentile};

/// Derived values for one bar. `None` means "not yet defined" (warm-up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub index: usize,
    pub open_time: DateTime<Utc>,
    pub close: f64,
    pub delta: f64,
    pub imbalance: f64,
    pub imbalance_z: Option<f64>,
    pub delta_z: Option<f64>,
    /// z of the configured flow source; drives detection.
    pub z: Option<f64>,
    /// |z_t − z_{t−1}|.
    pub z_jump: Option<f64>,
    pub atr: Option<f64>,
    pub donchian_high: Option<f64>,
    pub donchian_low: Option<f64>,
    pub rel_volume: Option<f64>,
    /// Threshold in force on this bar, resolved from the threshold policy.
    pub threshold: Option<f64>,
}

impl FeatureVector {
    /// Close at or below the prior-window low.
    pub fn at_window_low(&self) -> bool {
        self.donchian_low.is_some_and(|low| self.close <= low)
    }

    /// Close at or above the prior-window high.
    pub fn at_window_high(&self) -> bool {
        self.donchian_high.is_some_and(|high| self.close >= high)
    }
}

#[derive(Debug, Clone)]
enum ThresholdTracker {
    Static(f64),
    Dynamic {
        tracker: RollingPercentile,
        min_band: f64,
    },
}

impl ThresholdTracker {
    fn new(policy: &ThresholdPolicy) -> Self {
        match *policy {
            ThresholdPolicy::Static { z_band } => ThresholdTracker::Static(z_band),
            ThresholdPolicy::DynamicPercentile {
                window,
                min_periods,
                percentile,
                min_band,
            } => ThresholdTracker::Dynamic {
                tracker: RollingPercentile::new(window, min_periods, percentile),
                min_band,
            },
        }
    }

    fn update(&mut self, z: Option<f64>) -> Option<f64> {
        match self {
            ThresholdTracker::Static(band) => Some(*band),
            ThresholdTracker::Dynamic { tracker, min_band } => {
                let pct = match z {
                    Some(z) => tracker.update(z.abs()),
                    None => tracker.current(),
                };
                pct.map(|p| p.max(*min_band))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEngine {
    source: FlowSource,
    imbalance_z: FlowZScore,
    delta_z: FlowZScore,
    atr: Atr,
    upper: Donchian,
    lower: Donchian,
    rel_volume: RelativeVolume,
    threshold: ThresholdTracker,
    prev_z: Option<f64>,
    last_open_time: Option<DateTime<Utc>>,
    next_index: usize,
}

impl FeatureEngine {
    pub fn new(features: &FeatureConfig, threshold: &ThresholdPolicy) -> Self {
        Self {
            source: features.source,
            imbalance_z: FlowZScore::new(features.z_window, FlowSource::Imbalance),
            delta_z: FlowZScore::new(features.z_window, FlowSource::Delta),
            atr: Atr::new(features.atr_window),
            upper: Donchian::upper(features.donchian_window),
            lower: Donchian::lower(features.donchian_window),
            rel_volume: RelativeVolume::new(features.rel_volume_window),
            threshold: ThresholdTracker::new(threshold),
            prev_z: None,
            last_open_time: None,
            next_index: 0,
        }
    }

    /// Number of bars consumed so far.
    pub fn bars_seen(&self) -> usize {
        self.next_index
    }

    /// Consume the next bar.
    ///
    /// Fails with `MalformedInput` if the bar is not sane or its open time is
    /// not strictly after the previous bar's; engine state is left untouched.
    pub fn push(&mut self, bar: &Bar) -> CoreResult<FeatureVector> {
        let index = self.next_index;
        bar.check(index)?;
        if let Some(prev) = self.last_open_time {
            if bar.open_time <= prev {
                return Err(CoreError::malformed(
                    index,
                    "timestamps not strictly increasing",
                ));
            }
        }

        let imbalance_z = self.imbalance_z.update(bar);
        let delta_z = self.delta_z.update(bar);
        let z = match self.source {
            FlowSource::Imbalance => imbalance_z,
            FlowSource::Delta => delta_z,
        };
        let z_jump = match (z, self.prev_z) {
            (Some(cur), Some(prev)) => Some((cur - prev).abs()),
            _ => None,
        };
        let fv = FeatureVector {
            index,
            open_time: bar.open_time,
            close: bar.close,
            delta: bar.delta(),
            imbalance: bar.imbalance(),
            imbalance_z,
            delta_z,
            z,
            z_jump,
            atr: self.atr.update(bar),
            donchian_high: self.upper.update(bar),
            donchian_low: self.lower.update(bar),
            rel_volume: self.rel_volume.update(bar),
            threshold: self.threshold.update(z),
        };

        self.prev_z = z;
        self.last_open_time = Some(bar.open_time);
        self.next_index += 1;
        Ok(fv)
    }
}

/// Batch form: one feature vector per bar, in order.
pub fn compute_features(
    bars: &[Bar],
    features: &FeatureConfig,
    threshold: &ThresholdPolicy,
) -> CoreResult<Vec<FeatureVector>> {
    let mut engine = FeatureEngine::new(features, threshold);
    bars.iter().map(|b| engine.push(b)).collect()
}
