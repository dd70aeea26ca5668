//! ShockFlip Core — order-flow features, shock detector, barrier simulator, ledger.
//!
//! This crate contains the research engine:
//! - Domain types (bars, events, trades)
//! - Causal rolling indicators and the per-bar `FeatureEngine`
//! - The ShockFlip confirmation state machine
//! - First-touch barrier simulation with breakeven, trailing and zombie overlays
//! - The trade ledger and position policy
//! - Batch and streaming pipelines that must agree bar for bar

pub mod barrier;
pub mod config;
pub mod detector;
pub mod domain;
pub mod engine;
pub mod error;
pub mod features;
pub mod indicators;
pub mod ledger;

pub use config::StrategyConfig;
pub use engine::{run_batch, run_streaming, RunOutput, StreamingRun};
pub use error::{CoreError, CoreResult};
