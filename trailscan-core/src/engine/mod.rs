//! Trailing-stop signal engine.
//!
//! Pipeline per symbol:
//! 1. Validate parameters and the candle series
//! 2. Optional Heikin-Ashi transform (source candles)
//! 3. ATR of the source candles
//! 4. Trailing-stop recurrence over the source closes
//! 5. Crossovers of the EMA-1 reference line against the stop
//! 6. Buy/sell flags per candle
//!
//! The engine is a pure function of its inputs: no I/O, no logging, no state
//! carried between calls.

pub mod crossover;
pub mod error;
pub mod trailing_stop;

pub use crossover::{crossovers, Crossover};
pub use error::EngineError;
pub use trailing_stop::{next_position, trailing_stop, StopBranch, TrailPoint};

use crate::domain::{Candle, Signal, SignalRecord};
use crate::indicators::{heikin_ashi, Atr, Ema, Indicator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Span of the EMA used as the crossover reference line.
///
/// At span 1 the EMA reproduces the source series exactly. It is kept as a
/// real EMA so a longer span can be tried without touching the detector.
pub const REFERENCE_EMA_PERIOD: usize = 1;

/// Engine parameters, passed explicitly on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    /// ATR multiplier for the stop distance.
    pub key_value: f64,
    pub atr_period: usize,
    pub use_heikin_ashi: bool,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            key_value: 1.0,
            atr_period: 10,
            use_heikin_ashi: false,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.key_value.is_finite() || self.key_value <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "key_value must be a positive finite number, got {}",
                self.key_value
            )));
        }
        if self.atr_period == 0 {
            return Err(EngineError::InvalidParameter(
                "atr_period must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Minimum series length accepted by `compute_signals`.
    pub fn min_candles(&self) -> usize {
        self.atr_period + 1
    }
}

/// Check the candle series preconditions: long enough, finite, time-ordered.
pub fn validate_candles(candles: &[Candle], params: &SignalParams) -> Result<(), EngineError> {
    let required = params.min_candles();
    if candles.len() < required {
        return Err(EngineError::InsufficientData {
            len: candles.len(),
            required,
        });
    }

    for (index, candle) in candles.iter().enumerate() {
        if let Some(field) = candle.non_finite_field() {
            return Err(EngineError::MalformedCandle { index, field });
        }
        if index > 0 && candle.timestamp <= candles[index - 1].timestamp {
            return Err(EngineError::UnorderedTimestamps { index });
        }
    }

    Ok(())
}

/// Compute the per-candle trailing stop, regime and buy/sell flags.
///
/// The output has exactly one record per input candle. The actionable result
/// of a run is the last record (see [`terminal_signal`]).
pub fn compute_signals(
    candles: &[Candle],
    params: &SignalParams,
) -> Result<Vec<SignalRecord>, EngineError> {
    params.validate()?;
    validate_candles(candles, params)?;

    let source: Cow<'_, [Candle]> = if params.use_heikin_ashi {
        Cow::Owned(heikin_ashi(candles))
    } else {
        Cow::Borrowed(candles)
    };

    let src: Vec<f64> = source.iter().map(|c| c.close).collect();
    let atr = Atr::new(params.atr_period).compute(&source);
    let trail = trailing_stop(&src, &atr, params.key_value)?;

    let stops: Vec<f64> = trail.iter().map(|p| p.stop_level).collect();
    let reference = Ema::new(REFERENCE_EMA_PERIOD).compute(&source);
    let crosses = crossovers(&reference, &stops);

    let records = candles
        .iter()
        .zip(&src)
        .zip(trail.iter().zip(&crosses))
        .map(|((candle, &price), (point, cross))| SignalRecord {
            timestamp: candle.timestamp,
            close: candle.close,
            stop_level: point.stop_level,
            position: point.position,
            buy_signal: price > point.stop_level && cross.above,
            sell_signal: price < point.stop_level && cross.below,
        })
        .collect();

    Ok(records)
}

/// Signal of the most recent candle; `Signal::None` for an empty slice.
pub fn terminal_signal(records: &[SignalRecord]) -> Signal {
    records.last().map(SignalRecord::signal).unwrap_or_default()
}
