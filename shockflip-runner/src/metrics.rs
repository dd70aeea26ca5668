//! Trade-log statistics — pure functions over closed trades.
//!
//! Every metric is a pure function: trade list in, scalar out. Win/loss is
//! judged on `net_return` (after costs); R figures are gross.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shockflip_core::domain::{ExitLabel, ShockFlipEvent, Side, Trade};

/// Aggregate statistics for one trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub mean_r: f64,
    pub total_r: f64,
    pub mean_net_return: f64,
    pub total_net_return: f64,
    pub mean_mfe_r: f64,
    pub mean_mae_r: f64,
    pub mean_holding_bars: f64,
    pub max_consecutive_losses: usize,
    /// Keyed by the label's wire name, every label present.
    pub label_counts: BTreeMap<String, usize>,
    /// Losers whose MFE reached 1R before turning.
    pub zombie_losers: usize,
}

impl TradeSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            mean_r: mean(trades.iter().map(|t| t.r_multiple)),
            total_r: trades.iter().map(|t| t.r_multiple).sum(),
            mean_net_return: mean(trades.iter().map(|t| t.net_return)),
            total_net_return: trades.iter().map(|t| t.net_return).sum(),
            mean_mfe_r: mean(trades.iter().map(|t| t.mfe_r)),
            mean_mae_r: mean(trades.iter().map(|t| t.mae_r)),
            mean_holding_bars: mean(trades.iter().map(|t| t.holding_bars as f64)),
            max_consecutive_losses: max_consecutive_losses(trades),
            label_counts: label_counts(trades),
            zombie_losers: zombie_losers(trades, 1.0),
        }
    }
}

/// Event counts per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    pub total: usize,
    pub long: usize,
    pub short: usize,
}

impl EventCounts {
    pub fn compute(events: &[ShockFlipEvent]) -> Self {
        let long = events.iter().filter(|e| e.side == Side::Long).count();
        Self {
            total: events.len(),
            long,
            short: events.len() - long,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross gains / gross losses on net return. 0.0 when nothing was lost.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gains: f64 = trades.iter().map(|t| t.net_return).filter(|r| *r > 0.0).sum();
    let losses: f64 = trades.iter().map(|t| t.net_return).filter(|r| *r < 0.0).sum();
    if losses < 0.0 {
        gains / -losses
    } else {
        0.0
    }
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut best = 0;
    let mut run = 0;
    for t in trades {
        if t.is_winner() {
            run = 0;
        } else {
            run += 1;
            best = best.max(run);
        }
    }
    best
}

pub fn label_counts(trades: &[Trade]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = ExitLabel::ALL
        .iter()
        .map(|l| (l.as_str().to_string(), 0))
        .collect();
    for t in trades {
        *counts.entry(t.label.as_str().to_string()).or_default() += 1;
    }
    counts
}

/// Losing trades that were at least `mfe_r` R in profit at some point.
pub fn zombie_losers(trades: &[Trade], mfe_r: f64) -> usize {
    trades
        .iter()
        .filter(|t| !t.is_winner() && t.mfe_r >= mfe_r)
        .count()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
