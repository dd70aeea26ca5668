//! Trade — a closed barrier simulation with full excursion statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Side;

/// How a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitLabel {
    /// Take-profit touched.
    Tp,
    /// Initial stop-loss touched.
    Sl,
    /// Stop touched after it was moved to breakeven.
    Be,
    /// Stop touched after the trailing overlay moved it.
    Trailing,
    /// Closed by the zombie time-stop.
    Zombie,
    /// Still open when the data ran out; marked at the last close.
    OpenAtDataEnd,
}

impl ExitLabel {
    pub const ALL: [ExitLabel; 6] = [
        ExitLabel::Tp,
        ExitLabel::Sl,
        ExitLabel::Be,
        ExitLabel::Trailing,
        ExitLabel::Zombie,
        ExitLabel::OpenAtDataEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitLabel::Tp => "TP",
            ExitLabel::Sl => "SL",
            ExitLabel::Be => "BE",
            ExitLabel::Trailing => "TRAILING",
            ExitLabel::Zombie => "ZOMBIE",
            ExitLabel::OpenAtDataEnd => "OPEN_AT_DATA_END",
        }
    }
}

impl std::fmt::Display for ExitLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub side: Side,
    pub trigger_index: usize,
    pub confirm_index: usize,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub atr_at_entry: f64,
    /// Price distance of one R (ATR × side stop multiplier).
    pub r_unit: f64,
    pub initial_tp: f64,
    pub initial_sl: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub label: ExitLabel,
    pub final_sl: f64,

    // ── Result ──
    pub r_multiple: f64,
    /// Fractional return after taker fees and slippage on both legs.
    pub net_return: f64,

    // ── Excursion ──
    pub mfe_price: f64,
    pub mae_price: f64,
    pub mfe_r: f64,
    /// Adverse excursion in R, reported as a non-positive number.
    pub mae_r: f64,
    pub bars_to_mfe: usize,

    // ── Duration ──
    pub holding_bars: usize,
}

impl Trade {
    /// Profitable after costs.
    pub fn is_winner(&self) -> bool {
        self.net_return > 0.0
    }
}
