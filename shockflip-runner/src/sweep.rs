//! Micro-grid parameter sweep over detector settings.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use shockflip_core::config::ThresholdPolicy;
use shockflip_core::domain::Bar;
use shockflip_core::StrategyConfig;
use tracing::info;

use crate::fingerprint::strategy_hash;
use crate::metrics::{EventCounts, TradeSummary};
use crate::runner::RunError;

/// Values to sweep for each detector parameter.
///
/// `z_bands` sets the static band, or the floor of a dynamic threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub z_bands: Vec<f64>,
    pub jump_bands: Vec<f64>,
    pub persistence_bars: Vec<usize>,
}

impl Default for ParamGrid {
    /// z {2.0, 2.5, 3.0} × jump {2.0, 2.5, 3.0} × persistence {3, 6, 8}
    fn default() -> Self {
        Self {
            z_bands: vec![2.0, 2.5, 3.0],
            jump_bands: vec![2.0, 2.5, 3.0],
            persistence_bars: vec![3, 6, 8],
        }
    }
}

impl ParamGrid {
    /// Returns the total number of configurations in this grid.
    pub fn size(&self) -> usize {
        self.z_bands.len() * self.jump_bands.len() * self.persistence_bars.len()
    }

    /// All grid points applied to `base`, in row-major order (z, jump, persistence).
    pub fn generate_configs(&self, base: &StrategyConfig) -> Vec<StrategyConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &z in &self.z_bands {
            for &jump in &self.jump_bands {
                for &n in &self.persistence_bars {
                    let mut cfg = base.clone();
                    cfg.detector.threshold = match cfg.detector.threshold {
                        ThresholdPolicy::Static { .. } => ThresholdPolicy::Static { z_band: z },
                        ThresholdPolicy::DynamicPercentile {
                            window,
                            min_periods,
                            percentile,
                            ..
                        } => ThresholdPolicy::DynamicPercentile {
                            window,
                            min_periods,
                            percentile,
                            min_band: z,
                        },
                    };
                    cfg.detector.jump_band = jump;
                    cfg.detector.persistence_bars = n;
                    configs.push(cfg);
                }
            }
        }
        configs
    }
}

/// One line of `sweep.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub z_band: f64,
    pub jump_band: f64,
    pub persistence_bars: usize,
    pub strategy_hash: String,
    pub events: usize,
    pub long_events: usize,
    pub short_events: usize,
    pub trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub mean_r: f64,
    pub total_r: f64,
    pub mean_mfe_r: f64,
    pub zombie_losers: usize,
}

/// Parameter sweep executor.
///
/// Each grid point owns its own engines; results come back in grid order
/// whether or not the points ran in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &StrategyConfig,
        bars: &[Bar],
    ) -> Result<SweepResults, RunError> {
        let configs = grid.generate_configs(base);
        info!(points = configs.len(), parallel = self.parallel, "starting sweep");

        let rows = if self.parallel {
            configs
                .par_iter()
                .map(|cfg| run_point(cfg, bars))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|cfg| run_point(cfg, bars))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(SweepResults { rows })
    }
}

fn run_point(cfg: &StrategyConfig, bars: &[Bar]) -> Result<SweepRow, RunError> {
    let output = shockflip_core::run_batch(bars, cfg)?;
    let events = EventCounts::compute(&output.events);
    let summary = TradeSummary::compute(&output.trades);
    let z_band = match cfg.detector.threshold {
        ThresholdPolicy::Static { z_band } => z_band,
        ThresholdPolicy::DynamicPercentile { min_band, .. } => min_band,
    };
    Ok(SweepRow {
        z_band,
        jump_band: cfg.detector.jump_band,
        persistence_bars: cfg.detector.persistence_bars,
        strategy_hash: strategy_hash(cfg)?,
        events: events.total,
        long_events: events.long,
        short_events: events.short,
        trades: summary.trade_count,
        win_rate: summary.win_rate,
        profit_factor: summary.profit_factor,
        mean_r: summary.mean_r,
        total_r: summary.total_r,
        mean_mfe_r: summary.mean_mfe_r,
        zombie_losers: summary.zombie_losers,
    })
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone)]
pub struct SweepResults {
    rows: Vec<SweepRow>,
}

impl SweepResults {
    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows sorted by total R (descending). Ties keep grid order.
    pub fn sorted_by_total_r(&self) -> Vec<&SweepRow> {
        let mut sorted: Vec<_> = self.rows.iter().collect();
        sorted.sort_by(|a, b| b.total_r.total_cmp(&a.total_r));
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepRow> {
        self.sorted_by_total_r().into_iter().take(n).collect()
    }

    /// Best row by total R among rows that traded at all.
    pub fn best(&self) -> Option<&SweepRow> {
        self.sorted_by_total_r().into_iter().find(|r| r.trades > 0)
    }
}
