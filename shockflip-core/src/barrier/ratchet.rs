/// Ratchet invariant enforcement
///
/// **Core Rule:** Stops may tighten, never loosen.
///
/// Every stop move made by an overlay goes through `apply`, so the effective
/// stop of a long is non-decreasing and that of a short non-increasing over
/// the life of the trade, whatever the overlay proposes.
use crate::domain::Side;

/// Ratchet state for one trade's stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    /// High-water mark for longs, low-water mark for shorts.
    level: f64,
    side: Side,
}

impl RatchetState {
    /// Create a ratchet at the initial stop level.
    pub fn with_initial_level(side: Side, initial_level: f64) -> Self {
        Self {
            level: initial_level,
            side,
        }
    }

    /// True if `proposed` is strictly tighter than the current level.
    pub fn tightens(&self, proposed: f64) -> bool {
        self.side.is_better(proposed, self.level)
    }

    /// Apply ratchet to a proposed stop level
    ///
    /// Returns the ratcheted level (can only tighten, never loosen).
    ///
    /// # Example
    /// ```
    /// use shockflip_core::barrier::RatchetState;
    /// use shockflip_core::domain::Side;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(Side::Long, 95.0);
    ///
    /// // Tightening: $95 → $100 (allowed)
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    ///
    /// // Loosening: $100 → $90 (blocked, stays at $100)
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if self.tightens(proposed) {
            self.level = proposed;
        }
        self.level
    }

    pub fn current_level(&self) -> f64 {
        self.level
    }
}
