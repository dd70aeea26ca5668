//! Domain types for ShockFlip

pub mod bar;
pub mod event;
pub mod side;
pub mod trade;

pub use bar::{validate_bars, Bar, IMBALANCE_EPS};
pub use event::ShockFlipEvent;
pub use side::Side;
pub use trade::{ExitLabel, Trade};
