//! Scan orchestration: list markets, fetch candles, compute signals.
//!
//! Fetching is sequential and throttled by the provider; the engine runs once
//! per symbol on the rayon pool. A symbol that cannot be fetched or analysed
//! is recorded as skipped and never aborts the scan.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use trailscan_core::data::{CandleRequest, DataError, MarketDataProvider, Resolution};
use trailscan_core::{compute_signals, Candle, EngineError, Signal, SignalParams, SignalRecord};

use crate::config::{ConfigFingerprint, ScanConfig};
use crate::summary::SignalSummary;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no markets available: {0}")]
    NoMarkets(String),
}

/// Signals and digest for one analysed symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub records: Vec<SignalRecord>,
    pub summary: SignalSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Analyzed(SymbolReport),
    Skipped { symbol: String, reason: String },
}

impl SymbolOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolOutcome::Analyzed(report) => &report.symbol,
            SymbolOutcome::Skipped { symbol, .. } => symbol,
        }
    }

    pub fn report(&self) -> Option<&SymbolReport> {
        match self {
            SymbolOutcome::Analyzed(report) => Some(report),
            SymbolOutcome::Skipped { .. } => None,
        }
    }
}

/// A symbol whose most recent candle carries a BUY or SELL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub signal: Signal,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_fingerprint: ConfigFingerprint,
    pub resolution: Resolution,
    /// One entry per listed symbol, in listing order.
    pub outcomes: Vec<SymbolOutcome>,
}

impl ScanReport {
    pub fn analyzed(&self) -> impl Iterator<Item = &SymbolReport> {
        self.outcomes.iter().filter_map(SymbolOutcome::report)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            SymbolOutcome::Skipped { symbol, reason } => Some((symbol.as_str(), reason.as_str())),
            SymbolOutcome::Analyzed(_) => None,
        })
    }

    /// Terminal BUY/SELL signals, in listing order.
    pub fn alerts(&self) -> Vec<Alert> {
        self.analyzed()
            .filter(|r| r.summary.is_alert())
            .filter_map(|r| {
                let last = r.records.last()?;
                Some(Alert {
                    symbol: r.symbol.clone(),
                    signal: r.summary.terminal,
                    price: last.close,
                    timestamp: last.timestamp,
                })
            })
            .collect()
    }
}

/// Run the engine on one symbol's candles and summarise the result.
pub fn analyze_candles(
    symbol: &str,
    candles: &[Candle],
    params: &SignalParams,
    recent_window: usize,
) -> Result<SymbolReport, EngineError> {
    let records = compute_signals(candles, params)?;
    let summary =
        SignalSummary::from_records(&records, recent_window).ok_or(EngineError::EmptySeries)?;
    Ok(SymbolReport {
        symbol: symbol.to_string(),
        records,
        summary,
    })
}

pub struct Scanner<P: MarketDataProvider> {
    provider: P,
    config: ScanConfig,
}

impl<P: MarketDataProvider> Scanner<P> {
    pub fn new(provider: P, config: ScanConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Scan every listed market once, using `now` as the end of the fetch window.
    pub fn run(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let params = self.config.signal_params();
        let resolution = self.config.analysis.resolution;
        let window = self.config.analysis.recent_candles_to_check;

        let symbols = self
            .provider
            .list_markets()
            .map_err(|e| ScanError::NoMarkets(e.to_string()))?;
        if symbols.is_empty() {
            return Err(ScanError::NoMarkets(format!(
                "{} listed no tradable symbols",
                self.provider.name()
            )));
        }
        info!(
            provider = self.provider.name(),
            symbols = symbols.len(),
            %resolution,
            "starting scan"
        );

        let (from, to) = self.config.fetch_window(now);
        let request = CandleRequest {
            resolution,
            from,
            to,
        };

        let fetched: Vec<(String, Result<Vec<Candle>, DataError>)> = symbols
            .into_iter()
            .map(|symbol| {
                let candles = self
                    .provider
                    .fetch_candles(&symbol, &request)
                    .map(|result| result.candles);
                (symbol, candles)
            })
            .collect();

        let outcomes: Vec<SymbolOutcome> = fetched
            .into_par_iter()
            .map(|(symbol, candles)| analyze_symbol(symbol, candles, &params, window))
            .collect();

        let report = ScanReport {
            started_at,
            finished_at: Utc::now(),
            config_fingerprint: self.config.fingerprint(),
            resolution,
            outcomes,
        };

        info!(
            analyzed = report.analyzed().count(),
            skipped = report.skipped().count(),
            alerts = report.alerts().len(),
            "scan finished"
        );
        Ok(report)
    }
}

fn analyze_symbol(
    symbol: String,
    candles: Result<Vec<Candle>, DataError>,
    params: &SignalParams,
    window: usize,
) -> SymbolOutcome {
    let candles = match candles {
        Ok(candles) => candles,
        Err(e) => {
            warn!(%symbol, error = %e, "fetch failed, skipping symbol");
            return SymbolOutcome::Skipped {
                symbol,
                reason: e.to_string(),
            };
        }
    };

    match analyze_candles(&symbol, &candles, params, window) {
        Ok(report) => {
            debug!(
                %symbol,
                candles = candles.len(),
                terminal = %report.summary.terminal,
                "analysed"
            );
            if report.summary.is_alert() {
                info!(%symbol, signal = %report.summary.terminal, price = report.summary.last_close, "signal");
            }
            SymbolOutcome::Analyzed(report)
        }
        Err(e) => {
            warn!(%symbol, error = %e, "analysis failed, skipping symbol");
            SymbolOutcome::Skipped {
                symbol,
                reason: e.to_string(),
            }
        }
    }
}
