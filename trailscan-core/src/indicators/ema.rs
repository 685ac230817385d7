//! Exponential Moving Average (EMA), non-adjusted recursive form.
//!
//! alpha = 2 / (span + 1)
//! EMA[0] = x[0]
//! EMA[t] = ((1 - alpha) * EMA[t-1] + alpha * x[t]) / ((1 - alpha) + alpha)
//!
//! The normalising division and the skip on unchanged input keep the output
//! bit-compatible with pandas `ewm(span, adjust=False).mean()`. With span = 1
//! (alpha = 1) the output equals the input exactly.
//! No warm-up window: every index is defined.

use crate::domain::Candle;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute the recursive EMA of an arbitrary series with smoothing span `period`.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());

    let Some((&first, rest)) = values.split_first() else {
        return result;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut prev = first;
    result.push(prev);
    for &v in rest {
        if v != prev {
            prev = (decay * prev + alpha * v) / (decay + alpha);
        }
        result.push(prev);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close_exactly() {
        let values = [100.0, 200.3, 0.1 + 0.2, 1e-9, 123_456.789];
        let result = ema_of_series(&values, 1);
        assert_eq!(result, values.to_vec());
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, seeded with the first value
        // EMA = 10, 10.5, 11.25, 12.125, 13.0625
        let result = ema_of_series(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert_approx(result[2], 11.25, DEFAULT_EPSILON);
        assert_approx(result[3], 12.125, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0625, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_has_no_warmup_window() {
        let result = ema_of_series(&[5.0, 6.0], 20);
        assert!(result.iter().all(|v| v.is_finite()));
        assert_eq!(result[0], 5.0);
    }

    #[test]
    fn ema_of_empty_series_is_empty() {
        assert!(ema_of_series(&[], 10).is_empty());
    }

    #[test]
    fn ema_indicator_matches_series_on_closes() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ema = Ema::new(4);
        assert_eq!(ema.name(), "ema_4");
        assert_eq!(ema.compute(&candles), ema_of_series(&closes, 4));
    }
}
