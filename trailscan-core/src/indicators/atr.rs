//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the non-adjusted recursive EMA of the true range with span `period`
//! (alpha = 2/(period+1)), seeded with TR[0]. This is not Wilder smoothing.

use crate::domain::Candle;
use crate::indicators::ema::ema_of_series;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from candles.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;

    candles
        .iter()
        .map(|c| {
            let hl = c.high - c.low;
            let tr = match prev_close {
                Some(pc) => hl.max((c.high - pc).abs()).max((c.low - pc).abs()),
                None => hl,
            };
            prev_close = Some(c.close);
            tr
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        ema_of_series(&true_range(candles), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let candles = make_ohlc_candles(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 105-95 = 10
            (102.0, 108.0, 100.0, 106.0), // TR = max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&candles);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let candles = make_ohlc_candles(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // TR = max(7, |115-100|, |108-100|) = 15
        ]);
        let tr = true_range(&candles);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let candles = make_ohlc_candles(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        let result = Atr::new(3).compute(&candles);

        // alpha = 0.5, ATR[0] = TR[0]
        // ATR = 10, 9, 9, 7.5
        assert_eq!(result.len(), 4);
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 9.0, DEFAULT_EPSILON);
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
        assert_approx(result[3], 7.5, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_converges_on_constant_range() {
        let data: Vec<_> = (0..60).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        let result = Atr::new(10).compute(&make_ohlc_candles(&data));
        assert!(result.iter().all(|&v| (v - 2.0).abs() < DEFAULT_EPSILON));
    }

    #[test]
    fn atr_name() {
        assert_eq!(Atr::new(14).name(), "atr_14");
    }
}
