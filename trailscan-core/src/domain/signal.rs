//! Engine output types: trend regime, discrete signal, per-candle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend regime inferred from the source price relative to the trailing stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Long,
    Short,
}

impl Position {
    /// +1 for long, -1 for short.
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Short => -1,
        }
    }
}

/// Discrete trading signal for one candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    #[default]
    None,
    Buy,
    Sell,
}

impl Signal {
    /// Collapse the buy/sell flags of one candle. The flags are mutually
    /// exclusive; buy wins if a caller ever passes both.
    pub fn from_flags(buy: bool, sell: bool) -> Self {
        if buy {
            Signal::Buy
        } else if sell {
            Signal::Sell
        } else {
            Signal::None
        }
    }

    pub fn is_actionable(self) -> bool {
        self != Signal::None
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::None => "NONE",
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
        };
        f.write_str(s)
    }
}

/// One row of the engine's output, aligned with the input candle at the same index.
///
/// `close` is always the raw candle close, even when the stop was computed on
/// Heikin-Ashi candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub stop_level: f64,
    pub position: Position,
    pub buy_signal: bool,
    pub sell_signal: bool,
}

impl SignalRecord {
    pub fn signal(&self) -> Signal {
        Signal::from_flags(self.buy_signal, self.sell_signal)
    }
}
