//! ShockFlipEvent — a confirmed directional shock, produced once by the detector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Side;

/// A confirmed ShockFlip event.
///
/// The entry bar is always the bar after confirmation; the confirmation bar
/// itself is never traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockFlipEvent {
    pub side: Side,
    /// Bar on which the threshold + jump candidate first appeared.
    pub trigger_index: usize,
    /// Bar on which persistence and location were satisfied.
    pub confirm_index: usize,
    /// `confirm_index + 1`.
    pub entry_index: usize,
    pub confirm_time: DateTime<Utc>,

    // ── Snapshot at confirmation ──
    pub atr: f64,
    pub z: f64,
    pub threshold: f64,
    pub close: f64,
}

impl ShockFlipEvent {
    /// Bars between trigger and confirmation (0 when confirmed on the trigger bar).
    pub fn confirmation_delay(&self) -> usize {
        self.confirm_index - self.trigger_index
    }
}
