//! ShockFlipDetector — confirmation state machine over feature vectors.
//!
//! ```text
//!            threshold + jump              persistence + location + ATR
//!   IDLE ───────────────────▶ CANDIDATE ─────────────────────────────▶ emit event
//!     ▲                          │  side condition lost / expired /         │
//!     │                          │  location or volume rejected            ▼
//!     └──────────────────────────┘◀──────────── cooldown elapsed ───── COOLDOWN
//! ```
//!
//! Persistence counts, over the trailing `persistence_bars` window ending at
//! the evaluated bar, the bars whose z independently satisfies the side's
//! threshold condition. A candidate that is not yet persistent stays pending
//! while each following bar still satisfies the side condition, for at most
//! `persistence_bars` bars after the trigger.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::{DetectorConfig, LocationFilter, StrategyConfig};
use crate::domain::{ShockFlipEvent, Side};
use crate::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Candidate { side: Side, trigger_index: usize },
    /// Bars up to and including `until` are ignored.
    Cooldown { until: usize },
}

/// Result of evaluating a candidate on one bar.
enum Evaluation {
    Confirmed(ShockFlipEvent),
    Pending,
    Rejected(&'static str),
}

#[derive(Debug, Clone, Copy, Default)]
struct SideFlags {
    long: bool,
    short: bool,
}

impl SideFlags {
    fn get(self, side: Side) -> bool {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShockFlipDetector {
    cfg: DetectorConfig,
    cooldown_bars: usize,
    required: usize,
    state: DetectorState,
    history: VecDeque<SideFlags>,
    bars_seen: usize,
}

impl ShockFlipDetector {
    /// Build from an already validated configuration.
    pub fn new(config: &StrategyConfig) -> Self {
        let cfg = config.detector.clone();
        let required = cfg.persistence_required();
        Self {
            history: VecDeque::with_capacity(cfg.persistence_bars),
            cfg,
            cooldown_bars: config.cooldown_bars,
            required,
            state: DetectorState::Idle,
            bars_seen: 0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Feed the next feature vector; returns an event if this bar confirms one.
    pub fn on_bar(&mut self, fv: &FeatureVector) -> Option<ShockFlipEvent> {
        let flags = SideFlags {
            long: self.side_condition(Side::Long, fv),
            short: self.side_condition(Side::Short, fv),
        };
        if self.history.len() == self.cfg.persistence_bars {
            self.history.pop_front();
        }
        self.history.push_back(flags);
        self.bars_seen += 1;

        if let DetectorState::Cooldown { until } = self.state {
            if fv.index <= until {
                return None;
            }
            self.state = DetectorState::Idle;
        }

        if let DetectorState::Candidate {
            side,
            trigger_index,
        } = self.state
        {
            let age = fv.index - trigger_index;
            if flags.get(side) && age <= self.cfg.persistence_bars {
                return self.resolve(side, trigger_index, fv);
            }
            debug!(bar = fv.index, %side, trigger_index, "candidate dropped");
            self.state = DetectorState::Idle;
        }

        let side = self.candidate_side(fv, flags)?;
        debug!(bar = fv.index, %side, z = ?fv.z, "candidate");
        self.resolve(side, fv.index, fv)
    }

    fn resolve(
        &mut self,
        side: Side,
        trigger_index: usize,
        fv: &FeatureVector,
    ) -> Option<ShockFlipEvent> {
        match self.evaluate(side, trigger_index, fv) {
            Evaluation::Confirmed(event) => {
                debug!(
                    bar = fv.index,
                    %side,
                    trigger_index,
                    entry_index = event.entry_index,
                    "event confirmed"
                );
                self.state = if self.cooldown_bars > 0 {
                    DetectorState::Cooldown {
                        until: fv.index.saturating_add(self.cooldown_bars),
                    }
                } else {
                    DetectorState::Idle
                };
                Some(event)
            }
            Evaluation::Pending => {
                self.state = if fv.index - trigger_index >= self.cfg.persistence_bars {
                    DetectorState::Idle
                } else {
                    DetectorState::Candidate {
                        side,
                        trigger_index,
                    }
                };
                None
            }
            Evaluation::Rejected(reason) => {
                debug!(bar = fv.index, %side, reason, "candidate rejected");
                self.state = DetectorState::Idle;
                None
            }
        }
    }

    fn evaluate(&self, side: Side, trigger_index: usize, fv: &FeatureVector) -> Evaluation {
        if !self.persistent(side) {
            return Evaluation::Pending;
        }

        let located = match self.cfg.location {
            LocationFilter::Any => true,
            LocationFilter::DonchianExtreme => match side {
                Side::Long => fv.at_window_low(),
                Side::Short => fv.at_window_high(),
            },
        };
        if !located {
            return Evaluation::Rejected("location");
        }

        if let Some(min) = self.cfg.min_rel_volume {
            if !fv.rel_volume.is_some_and(|rv| rv >= min) {
                return Evaluation::Rejected("relative volume");
            }
        }

        let (Some(atr), Some(z), Some(threshold)) = (fv.atr, fv.z, fv.threshold) else {
            return Evaluation::Rejected("undefined feature");
        };
        if atr <= 0.0 {
            return Evaluation::Rejected("zero atr");
        }

        Evaluation::Confirmed(ShockFlipEvent {
            side,
            trigger_index,
            confirm_index: fv.index,
            entry_index: fv.index + 1,
            confirm_time: fv.open_time,
            atr,
            z,
            threshold,
            close: fv.close,
        })
    }

    fn side_condition(&self, side: Side, fv: &FeatureVector) -> bool {
        match (fv.z, fv.threshold) {
            (Some(z), Some(th)) => self.cfg.polarity.satisfies(side, z, th),
            _ => false,
        }
    }

    fn candidate_side(&self, fv: &FeatureVector, flags: SideFlags) -> Option<Side> {
        let jumped = fv.z_jump.is_some_and(|j| j >= self.cfg.jump_band);
        if !jumped {
            return None;
        }
        if flags.long {
            Some(Side::Long)
        } else if flags.short {
            Some(Side::Short)
        } else {
            None
        }
    }

    fn persistent(&self, side: Side) -> bool {
        let n = self.cfg.persistence_bars;
        if self.bars_seen < n {
            return false;
        }
        let hits = self.history.iter().filter(|f| f.get(side)).count();
        hits >= self.required
    }
}

/// Batch form: run the detector over precomputed features.
pub fn detect_events(features: &[FeatureVector], config: &StrategyConfig) -> Vec<ShockFlipEvent> {
    let mut detector = ShockFlipDetector::new(config);
    features.iter().filter_map(|fv| detector.on_bar(fv)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureConfig, FlowSource, ThresholdPolicy};
    use crate::features::compute_features;
    use crate::indicators::make_flow_bars;
    use chrono::TimeZone;

    fn config(persistence_bars: usize, ratio: f64, cooldown: usize) -> StrategyConfig {
        let mut cfg = StrategyConfig::default();
        cfg.detector.threshold = ThresholdPolicy::Static { z_band: 2.0 };
        cfg.detector.jump_band = 2.0;
        cfg.detector.persistence_bars = persistence_bars;
        cfg.detector.persistence_ratio = ratio;
        cfg.detector.location = LocationFilter::Any;
        cfg.cooldown_bars = cooldown;
        cfg
    }

    /// Feature vectors from a z path; z_jump derived from consecutive z.
    fn features(zs: &[f64]) -> Vec<FeatureVector> {
        let t0 = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        zs.iter()
            .enumerate()
            .map(|(i, &z)| FeatureVector {
                index: i,
                open_time: t0 + chrono::Duration::minutes(i as i64),
                close: 100.0,
                delta: 0.0,
                imbalance: 0.0,
                imbalance_z: Some(z),
                delta_z: None,
                z: Some(z),
                z_jump: if i == 0 { None } else { Some((z - zs[i - 1]).abs()) },
                atr: Some(1.0),
                donchian_high: Some(101.0),
                donchian_low: Some(100.0),
                rel_volume: Some(1.0),
                threshold: Some(2.0),
            })
            .collect()
    }

    #[test]
    fn confirms_on_second_shock_bar() {
        // trigger at 4 (jump 3.5), persistence 2 of 4 reached at 5
        let fvs = features(&[0.5, -0.5, 0.5, 0.5, -3.0, -2.5, 0.0]);
        let events = detect_events(&fvs, &config(4, 0.5, 0));
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.side, Side::Long);
        assert_eq!(e.trigger_index, 4);
        assert_eq!(e.confirm_index, 5);
        assert_eq!(e.entry_index, 6);
        assert_eq!(e.confirmation_delay(), 1);
    }

    #[test]
    fn exact_ratio_confirms_one_short_does_not() {
        let zs = [0.5, -0.5, 0.5, 0.5, -3.0, -2.5, 0.0];
        // 2 of 4 needed, 2 present
        assert_eq!(detect_events(&features(&zs), &config(4, 0.5, 0)).len(), 1);
        // 3 of 4 needed, window peaks at 2
        assert!(detect_events(&features(&zs), &config(4, 0.75, 0)).is_empty());
    }

    #[test]
    fn no_jump_no_candidate() {
        // drifts below the band without a jump ≥ 2.0
        let fvs = features(&[0.0, -1.0, -2.1, -2.2, -2.3, -2.4, -2.5]);
        assert!(detect_events(&fvs, &config(2, 0.5, 0)).is_empty());
    }

    #[test]
    fn short_side_mirrors() {
        let fvs = features(&[0.0, 0.0, 0.0, 3.0, 2.5]);
        let events = detect_events(&fvs, &config(2, 1.0, 0));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].side, Side::Short);
        assert_eq!(events[0].confirm_index, 4);
    }

    #[test]
    fn window_before_first_bar_cannot_confirm() {
        // shock at bar 1 with persistence window 3 (only 2 bars seen)
        let fvs = features(&[0.0, -3.0]);
        assert!(detect_events(&fvs, &config(3, 0.3, 0)).is_empty());
    }

    #[test]
    fn cooldown_suppresses_both_sides() {
        // event at 1, cooldown 3 covers bars 2..=4, second long at 5 allowed
        let zs = [0.0, -3.0, 0.0, 3.0, 0.0, -3.0, 0.0];
        let events = detect_events(&features(&zs), &config(1, 1.0, 3));
        let confirms: Vec<usize> = events.iter().map(|e| e.confirm_index).collect();
        assert_eq!(confirms, vec![1, 5]);
    }

    #[test]
    fn huge_cooldown_saturates() {
        let zs = [0.0, -3.0, 0.0, 3.0, 0.0, -3.0];
        let mut det = ShockFlipDetector::new(&config(1, 1.0, usize::MAX));
        let events: Vec<_> = features(&zs).iter().filter_map(|fv| det.on_bar(fv)).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(det.state(), DetectorState::Cooldown { until: usize::MAX });
    }

    #[test]
    fn pending_candidate_dropped_when_condition_lost() {
        // 3 of 3 required; the bar after the trigger no longer satisfies the band
        let fvs = features(&[0.0, 0.0, 0.0, -3.0, 0.0, -3.0]);
        let mut det = ShockFlipDetector::new(&config(3, 1.0, 0));
        for fv in &fvs[..4] {
            assert!(det.on_bar(fv).is_none());
        }
        assert_eq!(
            det.state(),
            DetectorState::Candidate {
                side: Side::Long,
                trigger_index: 3
            }
        );
        det.on_bar(&fvs[4]);
        assert_eq!(det.state(), DetectorState::Idle);
    }

    #[test]
    fn location_rejects_silently() {
        let mut cfg = config(1, 1.0, 0);
        cfg.detector.location = LocationFilter::DonchianExtreme;
        let mut fvs = features(&[0.0, -3.0]);
        // close 100.0 with window low 100.0 → at the low
        assert_eq!(detect_events(&fvs, &cfg).len(), 1);
        fvs[1].close = 100.5;
        let mut det = ShockFlipDetector::new(&cfg);
        det.on_bar(&fvs[0]);
        assert!(det.on_bar(&fvs[1]).is_none());
        assert_eq!(det.state(), DetectorState::Idle);
    }

    #[test]
    fn delta_source_fires_on_size_shock() {
        // steady ±10% split, then a sell-side bar ten times the usual size:
        // the split is unchanged, only the delta is extreme
        let mut data: Vec<(f64, f64, f64)> = (0..39)
            .map(|i| if i % 2 == 0 { (100.0, 55.0, 45.0) } else { (100.0, 45.0, 55.0) })
            .collect();
        data.push((100.0, 450.0, 550.0));
        data.push((100.0, 55.0, 45.0));
        let bars = make_flow_bars(&data);

        let cfg = config(1, 1.0, 0);
        let mut features = FeatureConfig {
            source: FlowSource::Imbalance,
            z_window: 20,
            atr_window: 3,
            donchian_window: 3,
            rel_volume_window: 2,
        };
        let fvs = compute_features(&bars, &features, &cfg.detector.threshold).unwrap();
        assert!(detect_events(&fvs, &cfg).is_empty());

        features.source = FlowSource::Delta;
        let fvs = compute_features(&bars, &features, &cfg.detector.threshold).unwrap();
        let events = detect_events(&fvs, &cfg);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].side, Side::Long);
        assert_eq!(events[0].confirm_index, 39);
        assert!(events[0].z < -3.5);
    }

    #[test]
    fn undefined_atr_is_no_signal() {
        let mut fvs = features(&[0.0, -3.0]);
        fvs[1].atr = None;
        assert!(detect_events(&fvs, &config(1, 1.0, 0)).is_empty());
    }

    #[test]
    fn relative_volume_filter() {
        let mut cfg = config(1, 1.0, 0);
        cfg.detector.min_rel_volume = Some(1.5);
        let mut fvs = features(&[0.0, -3.0]);
        assert!(detect_events(&fvs, &cfg).is_empty());
        fvs[1].rel_volume = Some(2.0);
        assert_eq!(detect_events(&fvs, &cfg).len(), 1);
    }
}
