//! Scan configuration loaded from TOML.
//!
//! ```toml
//! [indicator]
//! key_value = 1.0
//! atr_period = 10
//! use_heikin_ashi = false
//!
//! [analysis]
//! resolution = "60"
//! recent_candles_to_check = 10
//! days_of_data_to_fetch = 30
//! quote_assets = ["TMN", "USDT"]
//!
//! [telegram]
//! chat_id = "-1001234567890"
//!
//! [output]
//! directory = "wallex_analysis_results"
//!
//! [schedule]
//! interval_minutes = 60
//! ```
//!
//! Every section is optional and falls back to its defaults. The Telegram bot
//! token may be left out of the file and supplied through
//! `TRAILSCAN_TELEGRAM_TOKEN`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trailscan_core::data::{Resolution, WallexConfig};
use trailscan_core::SignalParams;

/// Environment variable that overrides `[telegram] bot_token`.
pub const TELEGRAM_TOKEN_ENV: &str = "TRAILSCAN_TELEGRAM_TOKEN";

/// Upper bound for `analysis.days_of_data_to_fetch` (about a century).
pub const MAX_DAYS_OF_DATA: u32 = 36_500;

/// Upper bound for `schedule.interval_minutes` (one year).
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unique identifier of the analysis settings (content-addressable hash).
pub type ConfigFingerprint = String;

/// Top-level scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub indicator: IndicatorConfig,
    pub analysis: AnalysisConfig,
    pub telegram: Option<TelegramConfig>,
    pub output: OutputConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub key_value: f64,
    pub atr_period: usize,
    pub use_heikin_ashi: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let params = SignalParams::default();
        Self {
            key_value: params.key_value,
            atr_period: params.atr_period,
            use_heikin_ashi: params.use_heikin_ashi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub resolution: Resolution,
    /// Trailing window summarised per symbol.
    pub recent_candles_to_check: usize,
    pub days_of_data_to_fetch: u32,
    pub quote_assets: Vec<String>,
    /// Minimum spacing between exchange requests.
    pub request_interval_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Minutes(60),
            recent_candles_to_check: 10,
            days_of_data_to_fetch: 30,
            quote_assets: vec!["TMN".into(), "USDT".into()],
            request_interval_ms: 500,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default)]
    pub message_thread_id: Option<i64>,
}

// Keep the token out of logs and panics.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("message_thread_id", &self.message_thread_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("wallex_analysis_results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

impl ScanConfig {
    /// Load from a TOML file, apply the token override and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides(std::env::var(TELEGRAM_TOKEN_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without touching the environment or validating.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Replace the Telegram bot token when an override is present.
    pub fn apply_env_overrides(&mut self, token: Option<String>) {
        if let (Some(telegram), Some(token)) = (self.telegram.as_mut(), token) {
            if !token.trim().is_empty() {
                telegram.bot_token = token.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let analysis = &self.analysis;
        if analysis.days_of_data_to_fetch == 0 {
            return Err(ConfigError::Invalid(
                "analysis.days_of_data_to_fetch must be >= 1".into(),
            ));
        }
        if analysis.days_of_data_to_fetch > MAX_DAYS_OF_DATA {
            return Err(ConfigError::Invalid(format!(
                "analysis.days_of_data_to_fetch must be <= {MAX_DAYS_OF_DATA}"
            )));
        }
        if analysis.recent_candles_to_check == 0 {
            return Err(ConfigError::Invalid(
                "analysis.recent_candles_to_check must be >= 1".into(),
            ));
        }
        if analysis.quote_assets.is_empty() {
            return Err(ConfigError::Invalid(
                "analysis.quote_assets must not be empty".into(),
            ));
        }
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.schedule.interval_minutes) {
            return Err(ConfigError::Invalid(format!(
                "schedule.interval_minutes must be in 1..={MAX_INTERVAL_MINUTES}"
            )));
        }
        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "telegram.bot_token is empty (set it in the file or via {TELEGRAM_TOKEN_ENV})"
                )));
            }
            if telegram.chat_id.is_empty() {
                return Err(ConfigError::Invalid("telegram.chat_id is empty".into()));
            }
        }
        Ok(())
    }

    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            key_value: self.indicator.key_value,
            atr_period: self.indicator.atr_period,
            use_heikin_ashi: self.indicator.use_heikin_ashi,
        }
    }

    pub fn wallex_config(&self) -> WallexConfig {
        WallexConfig {
            quote_assets: self.analysis.quote_assets.clone(),
            request_interval: std::time::Duration::from_millis(self.analysis.request_interval_ms),
            ..WallexConfig::default()
        }
    }

    /// Fetch window `[now - days, now]`, truncated to whole seconds.
    pub fn fetch_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let from = to - Duration::days(i64::from(self.analysis.days_of_data_to_fetch));
        (from, to)
    }

    /// Deterministic hash of the settings that shape the signals.
    ///
    /// Two scans with the same fingerprint ran the same analysis; credentials,
    /// output paths and scheduling are excluded.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let canonical = serde_json::json!({
            "indicator": self.indicator,
            "analysis": self.analysis,
        });
        blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"
[indicator]
key_value = 2.0
atr_period = 14
use_heikin_ashi = true

[analysis]
resolution = "240"
recent_candles_to_check = 5
days_of_data_to_fetch = 7
quote_assets = ["USDT"]

[telegram]
bot_token = "file-token"
chat_id = "-100123"
message_thread_id = 42

[output]
directory = "out"
"#;

    #[test]
    fn parses_full_file() {
        let config = ScanConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.indicator.key_value, 2.0);
        assert_eq!(config.indicator.atr_period, 14);
        assert!(config.indicator.use_heikin_ashi);
        assert_eq!(config.analysis.resolution, Resolution::Minutes(240));
        assert_eq!(config.analysis.recent_candles_to_check, 5);
        assert_eq!(config.analysis.quote_assets, vec!["USDT".to_string()]);
        // Missing keys inside a present section fall back to defaults.
        assert_eq!(config.analysis.request_interval_ms, 500);
        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.chat_id, "-100123");
        assert_eq!(telegram.message_thread_id, Some(42));
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.schedule.interval_minutes, 60);
        config.validate().unwrap();
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = ScanConfig::from_toml("").unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.signal_params(), SignalParams::default());
        assert!(config.telegram.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn daily_resolution_parses() {
        let config = ScanConfig::from_toml("[analysis]\nresolution = \"1D\"\n").unwrap();
        assert_eq!(config.analysis.resolution, Resolution::Daily);
    }

    #[test]
    fn rejects_bad_resolution() {
        assert!(matches!(
            ScanConfig::from_toml("[analysis]\nresolution = \"abc\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ScanConfig::default();
        config.indicator.key_value = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScanConfig::default();
        config.indicator.atr_period = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScanConfig::default();
        config.analysis.days_of_data_to_fetch = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScanConfig::default();
        config.schedule.interval_minutes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScanConfig::default();
        config.schedule.interval_minutes = MAX_INTERVAL_MINUTES + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_history_window_rejected() {
        let config =
            ScanConfig::from_toml("[analysis]\ndays_of_data_to_fetch = 4000000000\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ScanConfig::default();
        config.analysis.days_of_data_to_fetch = MAX_DAYS_OF_DATA;
        config.validate().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap();
        let (from, to) = config.fetch_window(now);
        assert_eq!(to - from, Duration::days(i64::from(MAX_DAYS_OF_DATA)));
    }

    #[test]
    fn telegram_token_required_after_overrides() {
        let mut config = ScanConfig::from_toml("[telegram]\nchat_id = \"1\"\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.apply_env_overrides(Some("env-token".into()));
        assert_eq!(config.telegram.as_ref().unwrap().bot_token, "env-token");
        config.validate().unwrap();
    }

    #[test]
    fn env_token_overrides_file_token() {
        let mut config = ScanConfig::from_toml(SAMPLE).unwrap();
        config.apply_env_overrides(Some("  env-token ".into()));
        assert_eq!(config.telegram.as_ref().unwrap().bot_token, "env-token");

        let mut config = ScanConfig::from_toml(SAMPLE).unwrap();
        config.apply_env_overrides(Some("   ".into()));
        assert_eq!(config.telegram.as_ref().unwrap().bot_token, "file-token");
    }

    #[test]
    fn debug_redacts_token() {
        let config = ScanConfig::from_toml(SAMPLE).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("file-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn fetch_window_spans_configured_days() {
        let config = ScanConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let (from, to) = config.fetch_window(now);
        assert_eq!(to.timestamp_subsec_millis(), 0);
        assert_eq!(to.timestamp() - from.timestamp(), 30 * 86_400);
    }

    #[test]
    fn fingerprint_deterministic_and_sensitive() {
        let a = ScanConfig::default();
        let mut b = ScanConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.output.directory = PathBuf::from("elsewhere");
        b.schedule.interval_minutes = 5;
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.indicator.key_value = 2.0;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn wallex_config_carries_analysis_settings() {
        let config = ScanConfig::from_toml(SAMPLE).unwrap();
        let wallex = config.wallex_config();
        assert_eq!(wallex.quote_assets, vec!["USDT".to_string()]);
        assert_eq!(wallex.request_interval, std::time::Duration::from_millis(500));
    }

    #[test]
    fn shipped_example_config_parses() {
        let mut config =
            ScanConfig::from_toml(include_str!("../../trailscan.example.toml")).unwrap();
        assert_eq!(config.signal_params(), SignalParams::default());
        config.apply_env_overrides(Some("token".into()));
        config.validate().unwrap();
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trailscan.toml");
        std::fs::write(&path, "[indicator]\natr_period = 0\n").unwrap();
        assert!(matches!(
            ScanConfig::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            ScanConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
