//! Report export: CSV tables and a JSON manifest per scan.
//!
//! Layout of a saved scan:
//!
//! ```text
//! <output_dir>/scan_<YYYYmmdd_HHMMSS>/
//!   summary.csv      one row per listed symbol
//!   <SYMBOL>.csv     per-candle signal records, one file per analysed symbol
//!   manifest.json    timing, config fingerprint, alerts, skipped symbols
//! ```
//!
//! The manifest carries a `schema_version`; unknown versions are rejected on load.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trailscan_core::data::Resolution;
use trailscan_core::SignalRecord;

use crate::scanner::{Alert, ScanReport, SymbolOutcome};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported schema version {found} (max supported: {max})", max = SCHEMA_VERSION)]
    UnsupportedSchema { found: u32 },

    #[error("export produced invalid output: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Scan metadata written next to the CSV tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanManifest {
    pub schema_version: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_fingerprint: String,
    pub resolution: Resolution,
    pub analyzed: usize,
    pub skipped: Vec<SkippedSymbol>,
    pub alerts: Vec<Alert>,
}

impl ScanManifest {
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            started_at: report.started_at,
            finished_at: report.finished_at,
            config_fingerprint: report.config_fingerprint.clone(),
            resolution: report.resolution,
            analyzed: report.analyzed().count(),
            skipped: report
                .skipped()
                .map(|(symbol, reason)| SkippedSymbol {
                    symbol: symbol.to_string(),
                    reason: reason.to_string(),
                })
                .collect(),
            alerts: report.alerts(),
        }
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Encoding(format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(data).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Per-candle signal table.
///
/// Columns: timestamp, close, stop_level, position, buy_signal, sell_signal, signal
pub fn signals_csv(records: &[SignalRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "close",
        "stop_level",
        "position",
        "buy_signal",
        "sell_signal",
        "signal",
    ])?;

    for r in records {
        wtr.write_record([
            r.timestamp.to_rfc3339(),
            format!("{:.8}", r.close),
            format!("{:.8}", r.stop_level),
            r.position.as_i8().to_string(),
            r.buy_signal.to_string(),
            r.sell_signal.to_string(),
            r.signal().to_string(),
        ])?;
    }

    finish(wtr)
}

/// One row per listed symbol, analysed or skipped.
///
/// Columns: symbol, status, terminal_signal, last_close, last_stop,
/// buys_in_window, sells_in_window, window, last_signal, last_signal_at, reason
pub fn summary_csv(report: &ScanReport) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "status",
        "terminal_signal",
        "last_close",
        "last_stop",
        "buys_in_window",
        "sells_in_window",
        "window",
        "last_signal",
        "last_signal_at",
        "reason",
    ])?;

    for outcome in &report.outcomes {
        match outcome {
            SymbolOutcome::Analyzed(r) => {
                let s = &r.summary;
                let (last_signal, last_signal_at) = match s.last_signal {
                    Some((at, signal)) => (signal.to_string(), at.to_rfc3339()),
                    None => (String::new(), String::new()),
                };
                wtr.write_record([
                    r.symbol.clone(),
                    "analyzed".to_string(),
                    s.terminal.to_string(),
                    format!("{:.8}", s.last_close),
                    format!("{:.8}", s.last_stop),
                    s.buys_in_window.to_string(),
                    s.sells_in_window.to_string(),
                    s.window.to_string(),
                    last_signal,
                    last_signal_at,
                    String::new(),
                ])?;
            }
            SymbolOutcome::Skipped { symbol, reason } => {
                let mut row = vec![String::new(); 11];
                row[0] = symbol.clone();
                row[1] = "skipped".to_string();
                row[10] = reason.clone();
                wtr.write_record(&row)?;
            }
        }
    }

    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// File name for a symbol's table; anything but ASCII alphanumerics, `-` and `_`
/// becomes `_`.
fn symbol_file_name(symbol: &str) -> String {
    let stem: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{stem}.csv")
}

fn write(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Save the full artifact set for one scan.
///
/// Returns the path to the created directory.
pub fn save_report(report: &ScanReport, output_dir: &Path) -> Result<PathBuf, ExportError> {
    let dirname = format!("scan_{}", report.started_at.format("%Y%m%d_%H%M%S"));
    let scan_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&scan_dir).map_err(|source| ExportError::Io {
        path: scan_dir.clone(),
        source,
    })?;

    write(&scan_dir.join("summary.csv"), &summary_csv(report)?)?;

    for r in report.analyzed() {
        write(&scan_dir.join(symbol_file_name(&r.symbol)), &signals_csv(&r.records)?)?;
    }

    let manifest = serde_json::to_string_pretty(&ScanManifest::from_report(report))?;
    write(&scan_dir.join("manifest.json"), &manifest)?;

    Ok(scan_dir)
}

/// Load the manifest of a saved scan. Rejects unknown schema versions.
pub fn load_manifest(dir: &Path) -> Result<ScanManifest, ExportError> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    let manifest: ScanManifest = serde_json::from_str(&json)?;
    if manifest.schema_version > SCHEMA_VERSION {
        return Err(ExportError::UnsupportedSchema {
            found: manifest.schema_version,
        });
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SignalSummary;
    use crate::scanner::SymbolReport;
    use chrono::{Duration, TimeZone};
    use trailscan_core::{Position, Signal};

    fn records() -> Vec<SignalRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        vec![
            SignalRecord {
                timestamp: base,
                close: 100.0,
                stop_level: 98.0,
                position: Position::Long,
                buy_signal: false,
                sell_signal: false,
            },
            SignalRecord {
                timestamp: base + Duration::hours(1),
                close: 80.0,
                stop_level: 91.5,
                position: Position::Short,
                buy_signal: false,
                sell_signal: true,
            },
        ]
    }

    fn report() -> ScanReport {
        let records = records();
        let summary = SignalSummary::from_records(&records, 10).unwrap();
        ScanReport {
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 5).unwrap(),
            config_fingerprint: "f00d".into(),
            resolution: Resolution::Minutes(60),
            outcomes: vec![
                SymbolOutcome::Analyzed(SymbolReport {
                    symbol: "BTCUSDT".into(),
                    records,
                    summary,
                }),
                SymbolOutcome::Skipped {
                    symbol: "DOGETMN".into(),
                    reason: "insufficient data".into(),
                },
            ],
        }
    }

    #[test]
    fn signals_csv_has_one_row_per_record() {
        let csv = signals_csv(&records()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,close,stop_level,position,buy_signal,sell_signal,signal"
        );
        assert!(lines[2].ends_with(",80.00000000,91.50000000,-1,false,true,SELL"));
    }

    #[test]
    fn summary_csv_lists_analyzed_and_skipped() {
        let csv = summary_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("BTCUSDT,analyzed,SELL,80.00000000,91.50000000,0,1,2,SELL,"));
        assert_eq!(lines[2], "DOGETMN,skipped,,,,,,,,,insufficient data");
    }

    #[test]
    fn symbol_file_names_are_sanitised() {
        assert_eq!(symbol_file_name("BTCUSDT"), "BTCUSDT.csv");
        assert_eq!(symbol_file_name("../ETH/TMN"), "___ETH_TMN.csv");
    }

    #[test]
    fn save_and_load_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = report();
        let scan_dir = save_report(&report, dir.path()).unwrap();

        assert_eq!(scan_dir.file_name().unwrap(), "scan_20240101_020000");
        assert!(scan_dir.join("summary.csv").exists());
        assert!(scan_dir.join("BTCUSDT.csv").exists());
        assert!(!scan_dir.join("DOGETMN.csv").exists());

        let manifest = load_manifest(&scan_dir).unwrap();
        assert_eq!(manifest.schema_version, SCHEMA_VERSION);
        assert_eq!(manifest.config_fingerprint, "f00d");
        assert_eq!(manifest.analyzed, 1);
        assert_eq!(manifest.skipped.len(), 1);
        assert_eq!(manifest.alerts.len(), 1);
        assert_eq!(manifest.alerts[0].signal, Signal::Sell);
    }

    #[test]
    fn rejects_future_schema() {
        let dir = tempfile::tempdir().unwrap();
        let scan_dir = save_report(&report(), dir.path()).unwrap();
        let path = scan_dir.join("manifest.json");
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        std::fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            load_manifest(&scan_dir),
            Err(ExportError::UnsupportedSchema { .. })
        ));
    }
}
