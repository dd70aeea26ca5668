//! Run orchestration — wires data loading, the core pipeline and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: resolves the config's data source, then runs. Used by CLI.
//! - `run_on_bars()`: takes pre-loaded bars. Used by sweeps and tests.

use serde::{Deserialize, Serialize};
use shockflip_core::domain::{Bar, ShockFlipEvent, Trade};
use shockflip_core::{run_batch, CoreError, StrategyConfig};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_bars, LoadError};
use crate::fingerprint::strategy_hash;
use crate::metrics::{EventCounts, TradeSummary};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Core(#[from] CoreError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub name: String,
    pub strategy_hash: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub bars: usize,
    pub events: EventCounts,
    pub rejected: usize,
    pub unfilled: usize,
    pub trades: TradeSummary,
}

/// Complete result of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub events: Vec<ShockFlipEvent>,
    pub trades: Vec<Trade>,
}

/// Load the configured bars and run the batch pipeline over them.
pub fn run_from_config(config: &RunConfig) -> Result<RunReport, RunError> {
    let loaded = load_bars(&config.data)?;
    let mut report = run_on_bars(&loaded.bars, &config.strategy, &loaded.dataset_hash)?;
    report.summary.name = config.name.clone();
    report.summary.synthetic = loaded.synthetic;
    Ok(report)
}

/// Run on pre-loaded bars — no I/O.
pub fn run_on_bars(
    bars: &[Bar],
    strategy: &StrategyConfig,
    dataset_hash: &str,
) -> Result<RunReport, RunError> {
    let output = run_batch(bars, strategy)?;
    let summary = RunSummary {
        schema_version: SCHEMA_VERSION,
        name: String::new(),
        strategy_hash: strategy_hash(strategy)?,
        dataset_hash: dataset_hash.to_string(),
        synthetic: false,
        bars: output.bars,
        events: EventCounts::compute(&output.events),
        rejected: output.rejected,
        unfilled: output.unfilled,
        trades: TradeSummary::compute(&output.trades),
    };
    info!(
        events = summary.events.total,
        trades = summary.trades.trade_count,
        win_rate = summary.trades.win_rate,
        total_r = summary.trades.total_r,
        "run complete"
    );
    Ok(RunReport {
        summary,
        events: output.events,
        trades: output.trades,
    })
}
