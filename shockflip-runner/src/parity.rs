//! Batch vs streaming parity check.
//!
//! Runs the same bars through `run_batch` and the bar-at-a-time engine, then
//! compares the serialized trade logs byte for byte.

use serde::{Deserialize, Serialize};
use shockflip_core::domain::{Bar, Trade};
use shockflip_core::{run_batch, run_streaming, StrategyConfig};
use tracing::{info, warn};

use crate::fingerprint::trade_log_digest;
use crate::runner::RunError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParityReport {
    pub bars: usize,
    pub batch_events: usize,
    pub streaming_events: usize,
    pub batch_trades: usize,
    pub streaming_trades: usize,
    pub batch_digest: String,
    pub streaming_digest: String,
    pub events_match: bool,
    pub trades_match: bool,
    /// Index into the trade logs of the first differing trade.
    pub first_mismatch: Option<usize>,
}

impl ParityReport {
    pub fn is_match(&self) -> bool {
        self.events_match && self.trades_match
    }
}

pub fn run_parity(bars: &[Bar], config: &StrategyConfig) -> Result<ParityReport, RunError> {
    let batch = run_batch(bars, config)?;
    let streaming = run_streaming(bars, config)?;

    let (batch_bytes, batch_digest) = trade_log_digest(&batch.trades)?;
    let (streaming_bytes, streaming_digest) = trade_log_digest(&streaming.trades)?;

    let trades_match = batch_bytes == streaming_bytes;
    let report = ParityReport {
        bars: bars.len(),
        batch_events: batch.events.len(),
        streaming_events: streaming.events.len(),
        batch_trades: batch.trades.len(),
        streaming_trades: streaming.trades.len(),
        batch_digest,
        streaming_digest,
        events_match: batch.events == streaming.events,
        trades_match,
        first_mismatch: if trades_match {
            None
        } else {
            first_mismatch(&batch.trades, &streaming.trades)
        },
    };

    if report.is_match() {
        info!(trades = report.batch_trades, digest = %report.batch_digest, "parity ok");
    } else {
        warn!(
            batch_trades = report.batch_trades,
            streaming_trades = report.streaming_trades,
            first_mismatch = ?report.first_mismatch,
            "batch and streaming runs diverge"
        );
    }
    Ok(report)
}

fn first_mismatch(a: &[Trade], b: &[Trade]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
