//! End-to-end pipelines: bars → features → events → trades.
//!
//! Two independent drivers produce the same `RunOutput`:
//! - `run_batch` computes every stage over the whole slice, then simulates
//!   each event forward over the bars;
//! - `StreamingRun` consumes one bar at a time and keeps only the state a
//!   live process would hold.
//!
//! Both are checked against each other by the runner's parity harness.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::barrier::{simulate_trade, OpenTrade};
use crate::config::{PositionPolicy, StrategyConfig};
use crate::detector::{detect_events, ShockFlipDetector};
use crate::domain::{validate_bars, Bar, ShockFlipEvent, Trade};
use crate::error::CoreResult;
use crate::features::{compute_features, FeatureEngine};
use crate::ledger::TradeLedger;

/// Result of one (instrument, configuration) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub bars: usize,
    pub events: Vec<ShockFlipEvent>,
    /// Ordered by entry bar.
    pub trades: Vec<Trade>,
    /// Events refused by the position policy.
    pub rejected: usize,
    /// Events whose entry bar lies past the end of the data.
    pub unfilled: usize,
}

// ── Batch ────────────────────────────────────────────────────────────

/// Run the whole pipeline over `bars`.
///
/// Fails on an invalid configuration or the first malformed bar; nothing is
/// simulated in either case.
pub fn run_batch(bars: &[Bar], config: &StrategyConfig) -> CoreResult<RunOutput> {
    config.validate()?;
    validate_bars(bars)?;

    let features = compute_features(bars, &config.features, &config.detector.threshold)?;
    let events = detect_events(&features, config);
    let mut ledger = TradeLedger::new(config.position_policy, config.cooldown_bars);

    for event in &events {
        if event.entry_index >= bars.len() {
            warn!(confirm = event.confirm_index, "event unfilled: entry bar past end of data");
            ledger.mark_unfilled();
            continue;
        }
        if !ledger.is_eligible(event.entry_index) {
            debug!(entry = event.entry_index, side = %event.side, "event rejected by position policy");
            ledger.reject();
            continue;
        }
        if let Some(trade) = simulate_trade(event, bars, config) {
            ledger.record(trade);
        }
    }

    let output = finish(bars.len(), events, ledger);
    info!(
        bars = output.bars,
        events = output.events.len(),
        trades = output.trades.len(),
        rejected = output.rejected,
        unfilled = output.unfilled,
        "batch run complete"
    );
    Ok(output)
}

fn finish(bars: usize, events: Vec<ShockFlipEvent>, ledger: TradeLedger) -> RunOutput {
    let rejected = ledger.rejected();
    let unfilled = ledger.unfilled();
    RunOutput {
        bars,
        events,
        trades: ledger.into_trades(),
        rejected,
        unfilled,
    }
}

// ── Streaming ────────────────────────────────────────────────────────

/// Incremental driver: one bar in, zero or more closed trades out.
#[derive(Debug)]
pub struct StreamingRun {
    config: StrategyConfig,
    features: FeatureEngine,
    detector: ShockFlipDetector,
    ledger: TradeLedger,
    open: Vec<OpenTrade>,
    /// Event confirmed on the previous bar, waiting for its entry bar.
    pending: Option<ShockFlipEvent>,
    events: Vec<ShockFlipEvent>,
    index: usize,
}

impl StreamingRun {
    pub fn new(config: &StrategyConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            features: FeatureEngine::new(&config.features, &config.detector.threshold),
            detector: ShockFlipDetector::new(config),
            ledger: TradeLedger::new(config.position_policy, config.cooldown_bars),
            config: config.clone(),
            open: Vec::new(),
            pending: None,
            events: Vec::new(),
            index: 0,
        })
    }

    pub fn bars_seen(&self) -> usize {
        self.index
    }

    pub fn open_trades(&self) -> usize {
        self.open.len()
    }

    /// Consume the next bar. Returns the trades that closed on it.
    ///
    /// A malformed bar is rejected before any state changes.
    pub fn push(&mut self, bar: &Bar) -> CoreResult<Vec<Trade>> {
        let fv = self.features.push(bar)?;
        let index = self.index;
        self.index += 1;

        if let Some(event) = self.pending.take() {
            let blocked = self.config.position_policy == PositionPolicy::SingleOpen
                && !self.open.is_empty();
            if blocked || !self.ledger.is_eligible(index) {
                debug!(entry = index, side = %event.side, "event rejected by position policy");
                self.ledger.reject();
            } else {
                self.open.push(OpenTrade::open(&event, bar, &self.config));
            }
        }

        let mut closed = Vec::new();
        let mut still_open = Vec::with_capacity(self.open.len());
        for mut trade in self.open.drain(..) {
            match trade.step(index, bar) {
                Some(done) => closed.push(done),
                None => still_open.push(trade),
            }
        }
        self.open = still_open;
        for trade in &closed {
            self.ledger.record(trade.clone());
        }

        if let Some(event) = self.detector.on_bar(&fv) {
            self.events.push(event.clone());
            self.pending = Some(event);
        }
        Ok(closed)
    }

    /// End of data: open trades close at the last bar, a pending entry is
    /// unfilled.
    pub fn finish(mut self) -> RunOutput {
        let open_at_end = self.open_trades();
        for trade in self.open.drain(..) {
            self.ledger.record(trade.close_at_data_end());
        }
        if let Some(event) = self.pending.take() {
            warn!(confirm = event.confirm_index, "event unfilled: entry bar past end of data");
            self.ledger.mark_unfilled();
        }
        let output = finish(self.index, self.events, self.ledger);
        info!(
            bars = output.bars,
            events = output.events.len(),
            trades = output.trades.len(),
            open_at_end,
            "streaming run complete"
        );
        output
    }
}

/// Feed every bar through a `StreamingRun`.
pub fn run_streaming(bars: &[Bar], config: &StrategyConfig) -> CoreResult<RunOutput> {
    let mut run = StreamingRun::new(config)?;
    for bar in bars {
        run.push(bar)?;
    }
    Ok(run.finish())
}
