//! Barrier engine — first-touch simulation of one trade per event.
//!
//! Per bar, in fixed order:
//! 1. stop overlays (breakeven, trailing) using excursion known through the
//!    previous bar, every move routed through the ratchet;
//! 2. zombie time-stop, when `ExitPrecedence::TimeoutFirst`;
//! 3. touch test against the effective levels, stop wins a same-bar tie;
//! 4. excursion update;
//! 5. zombie time-stop, when `ExitPrecedence::TouchFirst`.

pub mod gap;
pub mod ratchet;
pub mod simulate;
pub mod trailing;

pub use gap::{gapped_through, stop_fill_price};
pub use ratchet::RatchetState;
pub use simulate::{simulate_trade, OpenTrade};
pub use trailing::{StopSource, TrailingState};

use serde::{Deserialize, Serialize};

use crate::config::SideBarrier;
use crate::domain::Side;

/// Levels fixed at entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub side: Side,
    pub entry_price: f64,
    pub atr: f64,
    pub tp: f64,
    pub sl: f64,
    /// One R in price units: ATR × the side's stop multiplier.
    pub r_unit: f64,
}

impl Barrier {
    pub fn new(side: Side, entry_price: f64, atr: f64, mults: SideBarrier) -> Self {
        let s = side.sign();
        Self {
            side,
            entry_price,
            atr,
            tp: entry_price + s * mults.tp_mult * atr,
            sl: entry_price - s * mults.sl_mult * atr,
            r_unit: atr * mults.sl_mult,
        }
    }

    /// Signed distance from entry to `price`, in R.
    pub fn r_of(&self, price: f64) -> f64 {
        self.side.favorable_move(self.entry_price, price) / self.r_unit
    }

    /// Price that sits `r` R in the trade's favour from entry.
    pub fn price_at_r(&self, r: f64) -> f64 {
        self.entry_price + self.side.sign() * r * self.r_unit
    }
}
