//! Structured engine errors.
//!
//! The engine never logs or recovers; callers decide whether to skip the
//! symbol, refetch more history, or report.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: {len} candles, need at least {required}")]
    InsufficientData { len: usize, required: usize },

    #[error("malformed candle at index {index}: {field} is not finite")]
    MalformedCandle { index: usize, field: &'static str },

    #[error("candle timestamps must strictly increase (violated at index {index})")]
    UnorderedTimestamps { index: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("trailing stop needs a non-empty source series")]
    EmptySeries,

    #[error("source and ATR series differ in length ({src} vs {atr})")]
    LengthMismatch { src: usize, atr: usize },
}
