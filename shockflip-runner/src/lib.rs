//! ShockFlip Runner — data loading, run orchestration, sweeps and artifacts.
//!
//! This crate builds on `shockflip-core` to provide:
//! - Bar loading from CSV or a seeded synthetic generator
//! - Single runs with trade-log metrics and fingerprints
//! - Micro-grid parameter sweeps over the detector settings
//! - Batch vs streaming parity checks
//! - Forward-horizon event studies against a random-entry baseline
//! - CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod event_study;
pub mod export;
pub mod fingerprint;
pub mod metrics;
pub mod parity;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, DataSource, RunConfig, RunId};
pub use data_loader::{load_bars, read_bars_csv, LoadError, LoadedBars};
pub use event_study::{
    run_event_study, run_event_study_from_config, EventStudy, EventStudyConfig, HorizonSummary,
    Sample,
};
pub use fingerprint::{dataset_hash, strategy_hash, trade_log_digest};
pub use metrics::{EventCounts, TradeSummary};
pub use parity::{run_parity, ParityReport};
pub use runner::{run_from_config, run_on_bars, RunError, RunReport, RunSummary};
pub use sweep::{ParamGrid, ParamSweep, SweepResults, SweepRow};
pub use synthetic::{generate_bars, SyntheticSpec};
