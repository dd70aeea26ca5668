//! Bar-by-bar simulation of one open trade.

use chrono::{DateTime, Utc};

use super::{stop_fill_price, Barrier, StopSource, TrailingState};
use crate::config::{BarrierConfig, CostConfig, ExitPrecedence, StrategyConfig, ZombieFallback};
use crate::domain::{Bar, ExitLabel, ShockFlipEvent, Side, Trade};

/// A trade between entry and exit.
///
/// Created on the entry bar from an event; `step` must then be called with
/// every bar from the entry bar onward, in order.
#[derive(Debug, Clone)]
pub struct OpenTrade {
    trigger_index: usize,
    confirm_index: usize,
    entry_index: usize,
    entry_time: DateTime<Utc>,
    barrier: Barrier,
    state: TrailingState,
    cfg: BarrierConfig,
    costs: CostConfig,
    /// Last stepped bar: (index, close_time, close).
    last: Option<(usize, DateTime<Utc>, f64)>,
}

impl OpenTrade {
    /// Open at the entry bar's open using the ATR captured at confirmation.
    pub fn open(event: &ShockFlipEvent, entry_bar: &Bar, config: &StrategyConfig) -> Self {
        let barrier = Barrier::new(
            event.side,
            entry_bar.open,
            event.atr,
            config.barrier.for_side(event.side),
        );
        Self {
            trigger_index: event.trigger_index,
            confirm_index: event.confirm_index,
            entry_index: event.entry_index,
            entry_time: entry_bar.open_time,
            state: TrailingState::new(&barrier),
            barrier,
            cfg: config.barrier.clone(),
            costs: config.costs,
            last: None,
        }
    }

    pub fn state(&self) -> &TrailingState {
        &self.state
    }

    /// Advance one bar. Returns the closed trade if this bar exits.
    pub fn step(&mut self, index: usize, bar: &Bar) -> Option<Trade> {
        let k = index - self.entry_index;
        self.state = self.state.with_overlays(&self.barrier, &self.cfg);

        if self.cfg.exit_precedence == ExitPrecedence::TimeoutFirst && self.zombie_due(k) {
            self.state = self.state.observe_range(&self.barrier, bar.high, bar.low, k);
            let price = self.zombie_price(bar);
            return Some(self.close(index, bar.close_time, price, ExitLabel::Zombie));
        }

        if let Some((price, label)) = self.touch(bar) {
            self.state = self.state.observe(&self.barrier, price, k);
            return Some(self.close(index, bar.close_time, price, label));
        }

        self.state = self.state.observe_range(&self.barrier, bar.high, bar.low, k);
        self.last = Some((index, bar.close_time, bar.close));

        if self.cfg.exit_precedence == ExitPrecedence::TouchFirst && self.zombie_due(k) {
            let price = self.zombie_price(bar);
            return Some(self.close(index, bar.close_time, price, ExitLabel::Zombie));
        }
        None
    }

    /// Close at the last stepped bar's close.
    pub fn close_at_data_end(self) -> Trade {
        let (index, time, price) = self
            .last
            .unwrap_or((self.entry_index, self.entry_time, self.barrier.entry_price));
        self.close(index, time, price, ExitLabel::OpenAtDataEnd)
    }

    fn touch(&self, bar: &Bar) -> Option<(f64, ExitLabel)> {
        let sl = self.state.effective_sl();
        let tp = self.barrier.tp;
        let (sl_hit, tp_hit) = match self.barrier.side {
            Side::Long => (bar.low <= sl, bar.high >= tp),
            Side::Short => (bar.high >= sl, bar.low <= tp),
        };

        // both touched on one bar: the stop is assumed first
        if sl_hit {
            let price = stop_fill_price(self.cfg.gap_policy, self.barrier.side, sl, bar);
            let label = match self.state.stop_source {
                StopSource::Initial => ExitLabel::Sl,
                StopSource::Breakeven => ExitLabel::Be,
                StopSource::Trailing => ExitLabel::Trailing,
            };
            Some((price, label))
        } else if tp_hit {
            Some((tp, ExitLabel::Tp))
        } else {
            None
        }
    }

    fn zombie_due(&self, bars_since_entry: usize) -> bool {
        self.cfg.zombie.is_some_and(|z| {
            bars_since_entry == z.horizon_bars && self.state.best_mfe_r < z.mfe_threshold_r
        })
    }

    fn zombie_price(&self, bar: &Bar) -> f64 {
        match self.cfg.zombie.map(|z| z.fallback) {
            Some(ZombieFallback::Breakeven) => self.barrier.entry_price,
            _ => bar.close,
        }
    }

    fn close(&self, index: usize, time: DateTime<Utc>, price: f64, label: ExitLabel) -> Trade {
        let b = &self.barrier;
        let s = &self.state;
        Trade {
            side: b.side,
            trigger_index: self.trigger_index,
            confirm_index: self.confirm_index,
            entry_index: self.entry_index,
            entry_time: self.entry_time,
            entry_price: b.entry_price,
            atr_at_entry: b.atr,
            r_unit: b.r_unit,
            initial_tp: b.tp,
            initial_sl: b.sl,
            exit_index: index,
            exit_time: time,
            exit_price: price,
            label,
            final_sl: s.effective_sl(),
            r_multiple: b.r_of(price),
            net_return: b.side.favorable_move(b.entry_price, price) / b.entry_price
                - self.costs.round_trip(),
            mfe_price: s.best_price,
            mae_price: s.worst_price,
            mfe_r: s.best_mfe_r,
            mae_r: s.worst_mae_r,
            bars_to_mfe: s.bars_to_mfe,
            holding_bars: index - self.entry_index,
        }
    }
}

/// Simulate one event against the bar sequence.
///
/// Returns `None` when the entry bar lies beyond the data (the event is
/// unfilled, not an error).
pub fn simulate_trade(
    event: &ShockFlipEvent,
    bars: &[Bar],
    config: &StrategyConfig,
) -> Option<Trade> {
    let entry_bar = bars.get(event.entry_index)?;
    let mut trade = OpenTrade::open(event, entry_bar, config);
    for (index, bar) in bars.iter().enumerate().skip(event.entry_index) {
        if let Some(closed) = trade.step(index, bar) {
            return Some(closed);
        }
    }
    Some(trade.close_at_data_end())
}
