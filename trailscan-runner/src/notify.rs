//! Alert delivery.
//!
//! `format_alert` renders the Telegram HTML message; `Notifier` is the seam
//! that delivers it. `dispatch_alerts` sends one message per terminal signal
//! and keeps going when a delivery fails.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use trailscan_core::data::Resolution;
use trailscan_core::Signal;

use crate::config::TelegramConfig;
use crate::scanner::{Alert, ScanReport};

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivers a pre-formatted HTML message.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Escape HTML markup and quote characters (`&`, `<`, `>`, `"`, `'`).
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render the alert message for one symbol.
pub fn format_alert(alert: &Alert, resolution: Resolution) -> String {
    let (emoji, label) = match alert.signal {
        Signal::Buy => ("🟢", "BUY"),
        Signal::Sell => ("🔴", "SELL"),
        Signal::None => ("⚪", "NO"),
    };
    format!(
        "{emoji} <b>{label} SIGNAL!</b>\n\n\
         <b>Symbol:</b> #{symbol}\n\
         <b>Timeframe:</b> {timeframe}\n\
         <b>Price:</b> {price}\n",
        symbol = escape_html(&alert.symbol),
        timeframe = escape_html(&resolution.to_string()),
        price = escape_html(&format!("{:.8}", alert.price)),
    )
}

/// Telegram Bot API `sendMessage` client.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_url: String,
    config: TelegramConfig,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        Self::with_api_url(config, TELEGRAM_API_URL)
    }

    /// Point the notifier at a different Bot API host.
    pub fn with_api_url(config: TelegramConfig, api_url: &str) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    fn payload(&self, message: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": message,
            "parse_mode": "HTML",
        });
        if let Some(thread_id) = self.config.message_thread_id {
            body["message_thread_id"] = serde_json::json!(thread_id);
        }
        body
    }
}

impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.config.bot_token);
        let resp = self
            .client
            .post(&url)
            .json(&self.payload(message))
            .send()
            // reqwest errors embed the URL, which carries the token.
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body: TelegramResponse = resp
            .json()
            .map_err(|e| NotifyError::Transport(format!("HTTP {status}: {}", e.without_url())))?;

        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| format!("HTTP {status}")),
            ))
        }
    }
}

/// Outcome counts of one dispatch round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
}

/// Send one message per alert in the report. Failures are logged and counted.
pub fn dispatch_alerts(report: &ScanReport, notifier: &dyn Notifier) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for alert in report.alerts() {
        let message = format_alert(&alert, report.resolution);
        match notifier.send(&message) {
            Ok(()) => {
                info!(symbol = %alert.symbol, signal = %alert.signal, notifier = notifier.name(), "alert sent");
                summary.sent += 1;
            }
            Err(e) => {
                warn!(symbol = %alert.symbol, notifier = notifier.name(), error = %e, "alert delivery failed");
                summary.failed += 1;
            }
        }
    }

    summary
}
