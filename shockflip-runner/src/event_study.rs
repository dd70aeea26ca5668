//! Forward-horizon event study.
//!
//! Every confirmed event is anchored at its confirmation bar's close. For each
//! horizon H configured for the event's side the study records:
//! - the side-signed close-to-close return at bar `anchor + H`
//! - the best and worst excursion over bars `anchor + 1 ..= anchor + H`,
//!   in units of the event ATR
//!
//! The same measurements over uniformly drawn random anchors form a baseline,
//! so each (side, horizon) cell can be read as event mean versus random mean.
//! Horizons that run past the last bar are counted, not measured.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shockflip_core::detector::detect_events;
use shockflip_core::domain::{Bar, Side};
use shockflip_core::features::compute_features;
use shockflip_core::indicators::percentile_linear;
use shockflip_core::{CoreError, CoreResult, StrategyConfig};
use tracing::info;

use crate::config::RunConfig;
use crate::data_loader::load_bars;
use crate::runner::RunError;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStudyConfig {
    pub long_horizons: Vec<usize>,
    pub short_horizons: Vec<usize>,
    /// Random anchors drawn for the baseline; 0 disables it.
    pub baseline_samples: usize,
    pub seed: u64,
}

impl Default for EventStudyConfig {
    fn default() -> Self {
        Self {
            long_horizons: vec![12, 18, 60],
            short_horizons: vec![6, 12],
            baseline_samples: 2000,
            seed: 42,
        }
    }
}

impl EventStudyConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.long_horizons.contains(&0) {
            return Err(CoreError::invalid("event_study.long_horizons", "must be >= 1"));
        }
        if self.short_horizons.contains(&0) {
            return Err(CoreError::invalid("event_study.short_horizons", "must be >= 1"));
        }
        Ok(())
    }

    pub fn horizons(&self, side: Side) -> &[usize] {
        match side {
            Side::Long => &self.long_horizons,
            Side::Short => &self.short_horizons,
        }
    }

    fn max_horizon(&self) -> usize {
        self.long_horizons
            .iter()
            .chain(&self.short_horizons)
            .copied()
            .max()
            .unwrap_or(0)
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sample {
    Event,
    Baseline,
}

/// One row of the per-event output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardOutcome {
    pub anchor_index: usize,
    pub side: Side,
    pub horizon: usize,
    /// Side-signed close-to-close return.
    pub forward_return: f64,
    /// Non-negative.
    pub mfe_r: f64,
    /// Non-positive.
    pub mae_r: f64,
}

/// Aggregate for one (sample, side, horizon) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSummary {
    pub sample: Sample,
    pub side: Side,
    pub horizon: usize,
    pub count: usize,
    pub mean_return: f64,
    pub median_return: f64,
    /// Fraction of outcomes with a positive forward return.
    pub hit_rate: f64,
    pub mean_mfe_r: f64,
    pub mean_mae_r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStudy {
    pub events: usize,
    /// (event, horizon) pairs whose horizon ran past the data.
    pub truncated: usize,
    pub baseline_anchors: usize,
    pub outcomes: Vec<ForwardOutcome>,
    /// Event cells first, then baseline cells; long before short.
    pub summary: Vec<HorizonSummary>,
}

impl EventStudy {
    pub fn cell(&self, sample: Sample, side: Side, horizon: usize) -> Option<&HorizonSummary> {
        self.summary
            .iter()
            .find(|s| s.sample == sample && s.side == side && s.horizon == horizon)
    }

    /// Event mean return minus baseline mean return.
    pub fn lift(&self, side: Side, horizon: usize) -> Option<f64> {
        let event = self.cell(Sample::Event, side, horizon)?;
        let baseline = self.cell(Sample::Baseline, side, horizon)?;
        (event.count > 0 && baseline.count > 0).then(|| event.mean_return - baseline.mean_return)
    }
}

// ─── Measurement ─────────────────────────────────────────────────────

/// Outcome of holding `side` from the close of `anchor` for `horizon` bars.
///
/// `None` when the horizon runs past the data.
pub fn forward_outcome(
    bars: &[Bar],
    anchor: usize,
    side: Side,
    horizon: usize,
    atr: f64,
) -> Option<ForwardOutcome> {
    let end = anchor.checked_add(horizon)?;
    let window = bars.get(anchor + 1..=end)?;
    let entry = bars.get(anchor)?.close;
    let exit = window.last()?.close;

    let (mut best, mut worst) = (0.0_f64, 0.0_f64);
    for bar in window {
        let (favorable, adverse) = match side {
            Side::Long => (bar.high, bar.low),
            Side::Short => (bar.low, bar.high),
        };
        best = best.max(side.favorable_move(entry, favorable));
        worst = worst.min(side.favorable_move(entry, adverse));
    }

    Some(ForwardOutcome {
        anchor_index: anchor,
        side,
        horizon,
        forward_return: side.sign() * (exit / entry - 1.0),
        mfe_r: best / atr,
        mae_r: worst / atr,
    })
}

/// Run detection over `bars` and measure every event plus the random baseline.
pub fn run_event_study(
    bars: &[Bar],
    strategy: &StrategyConfig,
    config: &EventStudyConfig,
) -> Result<EventStudy, RunError> {
    strategy.validate()?;
    config.validate()?;

    let features = compute_features(bars, &strategy.features, &strategy.detector.threshold)?;
    let events = detect_events(&features, strategy);

    let mut outcomes = Vec::new();
    let mut truncated = 0;
    for event in &events {
        for &h in config.horizons(event.side) {
            match forward_outcome(bars, event.confirm_index, event.side, h, event.atr) {
                Some(outcome) => outcomes.push(outcome),
                None => truncated += 1,
            }
        }
    }

    let atrs: Vec<Option<f64>> = features.iter().map(|fv| fv.atr).collect();
    let (baseline_anchors, baseline) = sample_baseline(bars, &atrs, config);

    let mut summary = summarize(Sample::Event, &outcomes, config);
    summary.extend(summarize(Sample::Baseline, &baseline, config));

    info!(
        bars = bars.len(),
        events = events.len(),
        outcomes = outcomes.len(),
        truncated,
        baseline_anchors,
        "event study complete"
    );

    Ok(EventStudy {
        events: events.len(),
        truncated,
        baseline_anchors,
        outcomes,
        summary,
    })
}

/// Load the configured bars and run the study with the run file's settings.
pub fn run_event_study_from_config(config: &RunConfig) -> Result<EventStudy, RunError> {
    let loaded = load_bars(&config.data)?;
    run_event_study(&loaded.bars, &config.strategy, &config.event_study)
}

/// Draw `baseline_samples` anchors (with replacement) among bars with a
/// positive ATR and room for the longest horizon, and measure both sides.
fn sample_baseline(
    bars: &[Bar],
    atrs: &[Option<f64>],
    config: &EventStudyConfig,
) -> (usize, Vec<ForwardOutcome>) {
    let max_h = config.max_horizon();
    let eligible: Vec<(usize, f64)> = atrs
        .iter()
        .enumerate()
        .filter_map(|(i, atr)| match atr {
            Some(a) if *a > 0.0 && i + max_h < bars.len() => Some((i, *a)),
            _ => None,
        })
        .collect();
    if eligible.is_empty() || config.baseline_samples == 0 {
        return (0, Vec::new());
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut rows = Vec::new();
    for _ in 0..config.baseline_samples {
        let (anchor, atr) = eligible[rng.gen_range(0..eligible.len())];
        for side in [Side::Long, Side::Short] {
            for &h in config.horizons(side) {
                rows.extend(forward_outcome(bars, anchor, side, h, atr));
            }
        }
    }
    (config.baseline_samples, rows)
}

fn summarize(
    sample: Sample,
    outcomes: &[ForwardOutcome],
    config: &EventStudyConfig,
) -> Vec<HorizonSummary> {
    let mut cells = Vec::new();
    for side in [Side::Long, Side::Short] {
        for &horizon in config.horizons(side) {
            let rows: Vec<&ForwardOutcome> = outcomes
                .iter()
                .filter(|o| o.side == side && o.horizon == horizon)
                .collect();
            cells.push(summarize_cell(sample, side, horizon, &rows));
        }
    }
    cells
}

fn summarize_cell(
    sample: Sample,
    side: Side,
    horizon: usize,
    rows: &[&ForwardOutcome],
) -> HorizonSummary {
    let count = rows.len();
    let returns: Vec<f64> = rows.iter().map(|o| o.forward_return).collect();
    let mean = |f: fn(&ForwardOutcome) -> f64| {
        if count == 0 {
            0.0
        } else {
            rows.iter().map(|&o| f(o)).sum::<f64>() / count as f64
        }
    };
    HorizonSummary {
        sample,
        side,
        horizon,
        count,
        mean_return: mean(|o| o.forward_return),
        median_return: percentile_linear(&returns, 0.5).unwrap_or(0.0),
        hit_rate: if count == 0 {
            0.0
        } else {
            returns.iter().filter(|r| **r > 0.0).count() as f64 / count as f64
        },
        mean_mfe_r: mean(|o| o.mfe_r),
        mean_mae_r: mean(|o| o.mae_r),
    }
}
