//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over exchanges so the scanner can be
//! driven by the live Wallex client or by an in-memory fake in tests.

use crate::domain::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no candle data for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("invalid resolution '{0}' (expected minutes like \"60\" or \"D\")")]
    InvalidResolution(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Candle bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Minutes(u32),
    Daily,
}

impl Resolution {
    /// Value of the `resolution` query parameter.
    pub fn api_value(&self) -> String {
        match self {
            Resolution::Minutes(m) => m.to_string(),
            Resolution::Daily => "D".to_string(),
        }
    }
}

impl FromStr for Resolution {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "D" | "1D" => Ok(Resolution::Daily),
            digits => match digits.parse::<u32>() {
                Ok(m) if m > 0 => Ok(Resolution::Minutes(m)),
                _ => Err(DataError::InvalidResolution(s.to_string())),
            },
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Minutes(m) => write!(f, "{m} Minute"),
            Resolution::Daily => f.write_str("Daily"),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.api_value())
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Candle history query for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleRequest {
    pub resolution: Resolution,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Result of a successful candle fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub candles: Vec<Candle>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Wallex,
    CsvImport,
    Fixture,
}

/// Trait for exchange data providers.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Symbols eligible for analysis, already filtered to the configured quote assets.
    fn list_markets(&self) -> Result<Vec<String>, DataError>;

    /// Fetch OHLC candles for a symbol over the requested window.
    fn fetch_candles(&self, symbol: &str, request: &CandleRequest) -> Result<FetchResult, DataError>;
}
