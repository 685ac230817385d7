//! Domain types for trailscan

pub mod candle;
pub mod signal;

pub use candle::Candle;
pub use signal::{Position, Signal, SignalRecord};
