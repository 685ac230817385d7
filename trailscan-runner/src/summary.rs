//! Per-symbol digest of a signal series.
//!
//! The alert decision uses only the terminal record. The trailing window
//! counts give context for reports: how busy the symbol has been recently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trailscan_core::{terminal_signal, Signal, SignalRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    /// Signal of the most recent candle.
    pub terminal: Signal,
    pub last_close: f64,
    /// Stop level of the most recent candle.
    pub last_stop: f64,
    pub buys_in_window: usize,
    pub sells_in_window: usize,
    /// Number of records actually inspected (at most the requested window).
    pub window: usize,
    /// Most recent actionable signal inside the window.
    pub last_signal: Option<(DateTime<Utc>, Signal)>,
}

impl SignalSummary {
    /// Summarise the last `window` records. `None` for an empty series.
    pub fn from_records(records: &[SignalRecord], window: usize) -> Option<Self> {
        let last = records.last()?;
        let recent = &records[records.len().saturating_sub(window)..];

        let buys_in_window = recent.iter().filter(|r| r.buy_signal).count();
        let sells_in_window = recent.iter().filter(|r| r.sell_signal).count();
        let last_signal = recent
            .iter()
            .rev()
            .find(|r| r.signal().is_actionable())
            .map(|r| (r.timestamp, r.signal()));

        Some(Self {
            terminal: terminal_signal(records),
            last_close: last.close,
            last_stop: last.stop_level,
            buys_in_window,
            sells_in_window,
            window: recent.len(),
            last_signal,
        })
    }

    /// Whether the most recent candle carries a BUY or SELL.
    pub fn is_alert(&self) -> bool {
        self.terminal.is_actionable()
    }
}
