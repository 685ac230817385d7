//! Heikin-Ashi candle transform.
//!
//! close[t] = (open + high + low + close) / 4 of the raw candle.
//! open[0]  = (open[0] + close[0]) / 2 of the raw candle;
//! open[t]  = (open[t-1] + close[t-1]) / 2 of the derived candles.
//! high/low extend the raw extremes to cover the derived open and close.
//!
//! `open[t]` depends on `open[t-1]`, so the transform runs strictly left to right.

use crate::domain::Candle;

pub fn heikin_ashi(candles: &[Candle]) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());

    for raw in candles {
        let close = (raw.open + raw.high + raw.low + raw.close) / 4.0;
        let open = match out.last() {
            Some(prev) => (prev.open + prev.close) / 2.0,
            None => (raw.open + raw.close) / 2.0,
        };
        let high = raw.high.max(open).max(close);
        let low = raw.low.min(open).min(close);
        out.push(Candle::new(raw.timestamp, open, high, low, close));
    }

    out
}
