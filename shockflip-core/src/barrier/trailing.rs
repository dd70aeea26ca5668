//! Per-trade stop and excursion state.
//!
//! `TrailingState` is a small `Copy` value owned by exactly one open trade.
//! All transitions are pure: they take the state by value and return the
//! next one.

use serde::{Deserialize, Serialize};

use super::{Barrier, RatchetState};
use crate::config::{BarrierConfig, BreakevenConfig, OverlayOrder, TrailingConfig};
use crate::domain::Side;

/// Which overlay last moved the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopSource {
    Initial,
    Breakeven,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingState {
    pub armed: bool,
    /// Most favorable price seen so far.
    pub best_price: f64,
    /// Most adverse price seen so far.
    pub worst_price: f64,
    pub best_mfe_r: f64,
    /// Non-positive.
    pub worst_mae_r: f64,
    /// Bars from entry to the bar that set `best_price`.
    pub bars_to_mfe: usize,
    pub stop_source: StopSource,
    stop: RatchetState,
}

impl TrailingState {
    pub fn new(barrier: &Barrier) -> Self {
        Self {
            armed: false,
            best_price: barrier.entry_price,
            worst_price: barrier.entry_price,
            best_mfe_r: 0.0,
            worst_mae_r: 0.0,
            bars_to_mfe: 0,
            stop_source: StopSource::Initial,
            stop: RatchetState::with_initial_level(barrier.side, barrier.sl),
        }
    }

    pub fn effective_sl(&self) -> f64 {
        self.stop.current_level()
    }

    /// Apply the enabled overlays in configured order.
    #[must_use]
    pub fn with_overlays(self, barrier: &Barrier, cfg: &BarrierConfig) -> Self {
        match cfg.overlay_order {
            OverlayOrder::BreakevenFirst => self
                .with_breakeven(barrier, cfg.breakeven)
                .with_trailing(barrier, cfg.trailing),
            OverlayOrder::TrailingFirst => self
                .with_trailing(barrier, cfg.trailing)
                .with_breakeven(barrier, cfg.breakeven),
        }
    }

    #[must_use]
    pub fn with_breakeven(self, barrier: &Barrier, cfg: Option<BreakevenConfig>) -> Self {
        match cfg {
            Some(be) if self.best_mfe_r >= be.be_at_r => {
                self.tighten(barrier.entry_price, StopSource::Breakeven)
            }
            _ => self,
        }
    }

    #[must_use]
    pub fn with_trailing(self, barrier: &Barrier, cfg: Option<TrailingConfig>) -> Self {
        let Some(tr) = cfg else {
            return self;
        };
        let mut next = self;
        if !next.armed && next.best_mfe_r >= tr.arm_threshold_r {
            next.armed = true;
        }
        if !next.armed {
            return next;
        }
        let trail_r = (next.best_mfe_r - tr.gap_r).max(tr.floor_r);
        next.tighten(barrier.price_at_r(trail_r), StopSource::Trailing)
    }

    /// Fold a bar's full range into the excursion.
    #[must_use]
    pub fn observe_range(self, barrier: &Barrier, high: f64, low: f64, bars_since_entry: usize) -> Self {
        let (favorable, adverse) = match barrier.side {
            Side::Long => (high, low),
            Side::Short => (low, high),
        };
        self.observe(barrier, favorable, bars_since_entry)
            .observe(barrier, adverse, bars_since_entry)
    }

    /// Fold a single traded price into the excursion.
    #[must_use]
    pub fn observe(mut self, barrier: &Barrier, price: f64, bars_since_entry: usize) -> Self {
        let side = barrier.side;
        if side.is_better(price, self.best_price) {
            self.best_price = price;
            self.best_mfe_r = barrier.r_of(price).max(0.0);
            self.bars_to_mfe = bars_since_entry;
        }
        if side.is_better(self.worst_price, price) {
            self.worst_price = price;
            self.worst_mae_r = barrier.r_of(price).min(0.0);
        }
        self
    }

    fn tighten(mut self, proposed: f64, source: StopSource) -> Self {
        if self.stop.tightens(proposed) {
            self.stop.apply(proposed);
            self.stop_source = source;
        }
        self
    }
}
