//! Gap handling for stop exits.
//!
//! A stop is gapped through when the bar opens already beyond it. Under
//! `GapPolicy::FillAtOpen` the fill is the (worse) open; under
//! `GapPolicy::FillAtLevel` it is the stop level itself.

use crate::config::GapPolicy;
use crate::domain::{Bar, Side};

/// True if `bar` opened on the losing side of a stop at `level`.
pub fn gapped_through(side: Side, level: f64, bar: &Bar) -> bool {
    match side {
        Side::Long => bar.open < level,
        Side::Short => bar.open > level,
    }
}

/// Fill price for a stop at `level` touched on `bar`.
pub fn stop_fill_price(policy: GapPolicy, side: Side, level: f64, bar: &Bar) -> f64 {
    match policy {
        GapPolicy::FillAtOpen if gapped_through(side, level, bar) => bar.open,
        _ => level,
    }
}
