//! trailscan runner: scan orchestration on top of `trailscan-core`.
//!
//! This crate provides:
//! - TOML scan configuration with a content-addressed fingerprint
//! - The market scanner (sequential fetch, parallel per-symbol analysis)
//! - Per-symbol signal summaries and terminal-signal alerts
//! - Telegram notifications
//! - CSV / JSON report export
//! - A fixed-interval scheduler for continuous scanning

pub mod config;
pub mod export;
pub mod notify;
pub mod scanner;
pub mod schedule;
pub mod summary;

pub use config::{ConfigError, ConfigFingerprint, ScanConfig, TelegramConfig};
pub use export::{load_manifest, save_report, ExportError, ScanManifest};
pub use notify::{dispatch_alerts, format_alert, DispatchSummary, Notifier, NotifyError, TelegramNotifier};
pub use scanner::{analyze_candles, Alert, ScanError, ScanReport, Scanner, SymbolOutcome, SymbolReport};
pub use schedule::Schedule;
pub use summary::SignalSummary;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<ScanConfig>();
        assert_sync::<ScanConfig>();
    }

    #[test]
    fn reports_are_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
        assert_send::<SymbolOutcome>();
        assert_sync::<SymbolOutcome>();
        assert_send::<SignalSummary>();
        assert_sync::<SignalSummary>();
    }

    #[test]
    fn scanner_is_send_sync() {
        assert_send::<Scanner<trailscan_core::data::WallexProvider>>();
        assert_sync::<Scanner<trailscan_core::data::WallexProvider>>();
    }

    #[test]
    fn telegram_notifier_is_send_sync() {
        assert_send::<TelegramNotifier>();
        assert_sync::<TelegramNotifier>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<ScanError>();
        assert_sync::<ScanError>();
        assert_send::<NotifyError>();
        assert_sync::<NotifyError>();
        assert_send::<ExportError>();
        assert_sync::<ExportError>();
    }
}
