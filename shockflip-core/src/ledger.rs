//! TradeLedger — closed-trade accumulation and position admission.

use crate::config::PositionPolicy;
use crate::domain::Trade;

#[derive(Debug, Clone)]
pub struct TradeLedger {
    policy: PositionPolicy,
    cooldown_bars: usize,
    trades: Vec<Trade>,
    /// Latest exit bar among recorded trades.
    last_exit: Option<usize>,
    rejected: usize,
    unfilled: usize,
}

impl TradeLedger {
    pub fn new(policy: PositionPolicy, cooldown_bars: usize) -> Self {
        Self {
            policy,
            cooldown_bars,
            trades: Vec::new(),
            last_exit: None,
            rejected: 0,
            unfilled: 0,
        }
    }

    /// Whether a trade entering at `entry_index` may be opened.
    ///
    /// Under `SingleOpen` the entry must lie strictly after the previous
    /// exit plus the cooldown.
    pub fn is_eligible(&self, entry_index: usize) -> bool {
        match (self.policy, self.last_exit) {
            (PositionPolicy::Unrestricted, _) | (_, None) => true,
            (PositionPolicy::SingleOpen, Some(exit)) => {
                entry_index > exit.saturating_add(self.cooldown_bars)
            }
        }
    }

    pub fn record(&mut self, trade: Trade) {
        self.last_exit = Some(self.last_exit.map_or(trade.exit_index, |e| e.max(trade.exit_index)));
        self.trades.push(trade);
    }

    pub fn reject(&mut self) {
        self.rejected += 1;
    }

    pub fn mark_unfilled(&mut self) {
        self.unfilled += 1;
    }

    pub fn policy(&self) -> PositionPolicy {
        self.policy
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn unfilled(&self) -> usize {
        self.unfilled
    }

    /// Trades ordered by entry bar. Trades sharing an entry bar keep
    /// their recording order.
    pub fn into_trades(mut self) -> Vec<Trade> {
        self.trades.sort_by_key(|t| t.entry_index);
        self.trades
    }
}
