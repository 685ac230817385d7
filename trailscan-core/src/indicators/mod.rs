//! Indicator implementations.
//!
//! Indicators are pure functions: candle history in, numeric series out, one
//! value per input candle. Unlike windowed indicators they have no warm-up
//! NaN prefix; the recursive EMA form is defined from index 0.

pub mod atr;
pub mod ema;
pub mod heikin_ashi;

pub use atr::{true_range, Atr};
pub use ema::{ema_of_series, Ema};
pub use heikin_ashi::heikin_ashi;

use crate::domain::Candle;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at index t may depend on candle data from t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_10", "ema_1").
    fn name(&self) -> &str;

    /// Compute the indicator for the entire candle series.
    ///
    /// Returns a `Vec<f64>` of the same length as `candles`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle), high/low straddle
/// open and close by 1.0, one hour apart.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Candle::new(test_timestamp(i), open, high, low, close)
        })
        .collect()
}

/// Build candles from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle::new(test_timestamp(i), open, high, low, close))
        .collect()
}

#[cfg(test)]
fn test_timestamp(i: usize) -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc
        .with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
