//! ATR trailing-stop recurrence.
//!
//! A loop-carried fold over the source series: each point depends only on the
//! previous point, the previous and current source price, and the current
//! loss threshold `key_value * atr`. Parallelising across indices is invalid.
//!
//! Ratchet invariant: while price stays on one side of the stop, the stop only
//! moves in the trend's favour.

use crate::domain::Position;

use super::EngineError;

/// Which stop update rule applied at a given index.
///
/// Variants are listed in evaluation priority. Equality with the previous stop
/// satisfies neither strict comparison and falls through to `ResetAbove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBranch {
    /// Price above the stop on both bars: stop ratchets up, never down.
    TrailLong,
    /// Price below the stop on both bars: stop ratchets down, never up.
    TrailShort,
    /// Price just moved above the stop: reset one loss below price.
    ResetBelow,
    /// Anything else (downward cross or tie): reset one loss above price.
    ResetAbove,
}

impl StopBranch {
    pub fn select(src: f64, prev_src: f64, prev_stop: f64) -> Self {
        let is_above = src > prev_stop;
        let is_below = src < prev_stop;
        let was_above = prev_src > prev_stop;
        let was_below = prev_src < prev_stop;

        match (is_above, is_below, was_above, was_below) {
            (true, _, true, _) => StopBranch::TrailLong,
            (_, true, _, true) => StopBranch::TrailShort,
            (true, _, _, _) => StopBranch::ResetBelow,
            _ => StopBranch::ResetAbove,
        }
    }

    pub fn apply(self, src: f64, loss: f64, prev_stop: f64) -> f64 {
        match self {
            StopBranch::TrailLong => prev_stop.max(src - loss),
            StopBranch::TrailShort => prev_stop.min(src + loss),
            StopBranch::ResetBelow => src - loss,
            StopBranch::ResetAbove => src + loss,
        }
    }
}

/// Regime carried from the previous bar, flipped only on a strict crossing of
/// the previous stop level.
pub fn next_position(prev: Position, src: f64, prev_src: f64, prev_stop: f64) -> Position {
    if prev_src < prev_stop && src > prev_stop {
        Position::Long
    } else if prev_src > prev_stop && src < prev_stop {
        Position::Short
    } else {
        prev
    }
}

/// Trailing-stop state at one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub stop_level: f64,
    pub position: Position,
    /// `None` at index 0, which has no predecessor.
    pub branch: Option<StopBranch>,
}

impl TrailPoint {
    /// Initial condition: long, with the stop one loss below the first price.
    pub fn seed(src: f64, loss: f64) -> Self {
        Self {
            stop_level: src - loss,
            position: Position::Long,
            branch: None,
        }
    }

    /// Advance the recurrence by one bar.
    pub fn step(&self, prev_src: f64, src: f64, loss: f64) -> Self {
        let prev_stop = self.stop_level;
        let branch = StopBranch::select(src, prev_src, prev_stop);
        Self {
            stop_level: branch.apply(src, loss, prev_stop),
            position: next_position(self.position, src, prev_src, prev_stop),
            branch: Some(branch),
        }
    }
}

/// Run the recurrence over an index-aligned source and ATR series.
pub fn trailing_stop(src: &[f64], atr: &[f64], key_value: f64) -> Result<Vec<TrailPoint>, EngineError> {
    if src.len() != atr.len() {
        return Err(EngineError::LengthMismatch {
            src: src.len(),
            atr: atr.len(),
        });
    }
    if src.is_empty() {
        return Err(EngineError::EmptySeries);
    }

    let mut points: Vec<TrailPoint> = Vec::with_capacity(src.len());
    for (i, (&price, &range)) in src.iter().zip(atr).enumerate() {
        let loss = key_value * range;
        let point = match points.last() {
            Some(prev) => prev.step(src[i - 1], price, loss),
            None => TrailPoint::seed(price, loss),
        };
        points.push(point);
    }

    Ok(points)
}
