//! Wallex exchange data provider.
//!
//! Two public endpoints:
//! - `GET /v1/markets`: all listed markets, keyed by symbol
//! - `GET /v1/udf/history`: TradingView UDF candle history
//!
//! Every request passes through a `RequestThrottle`; connect/timeout errors,
//! HTTP 429 and 5xx are retried with exponential backoff.

use super::provider::{CandleRequest, DataError, DataSource, FetchResult, MarketDataProvider};
use super::throttle::RequestThrottle;
use crate::domain::Candle;
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.wallex.ir";

const MARKETS_TIMEOUT: Duration = Duration::from_secs(20);
const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// `/v1/markets` response.
#[derive(Debug, Deserialize)]
struct MarketsResponse {
    success: Option<bool>,
    result: Option<MarketsResult>,
}

#[derive(Debug, Deserialize)]
struct MarketsResult {
    symbols: Option<BTreeMap<String, serde_json::Value>>,
}

/// `/v1/udf/history` response. Prices arrive as numbers or numeric strings.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    s: String,
    t: Option<Vec<Numeric>>,
    o: Option<Vec<Numeric>>,
    h: Option<Vec<Numeric>>,
    l: Option<Vec<Numeric>>,
    c: Option<Vec<Numeric>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(v) => Some(*v),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Provider settings.
#[derive(Debug, Clone)]
pub struct WallexConfig {
    pub base_url: String,
    /// Quote assets a symbol must end with to be analysed (e.g. "TMN", "USDT").
    pub quote_assets: Vec<String>,
    pub request_interval: Duration,
    pub max_retries: u32,
}

impl Default for WallexConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            quote_assets: vec!["TMN".to_string(), "USDT".to_string()],
            request_interval: Duration::from_millis(500),
            max_retries: 2,
        }
    }
}

pub struct WallexProvider {
    client: reqwest::blocking::Client,
    config: WallexConfig,
    throttle: RequestThrottle,
    base_delay: Duration,
}

impl WallexProvider {
    pub fn new(config: WallexConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("trailscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            throttle: RequestThrottle::new(config.request_interval),
            config,
            base_delay: Duration::from_millis(500),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// GET a JSON document with throttling and retry.
    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }
            self.throttle.wait();

            match self.client.get(url).query(query).timeout(timeout).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(DataError::RateLimited);
                        continue;
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::Other(format!("HTTP {status} from {url}")));
                        continue;
                    }

                    if !status.is_success() {
                        return Err(DataError::Other(format!("HTTP {status} from {url}")));
                    }

                    return resp.json::<T>().map_err(|e| {
                        DataError::ResponseFormatChanged(format!("failed to parse {url}: {e}"))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketDataProvider for WallexProvider {
    fn name(&self) -> &str {
        "wallex"
    }

    fn list_markets(&self) -> Result<Vec<String>, DataError> {
        let resp: MarketsResponse = self.get_json(&self.url("/v1/markets"), &[], MARKETS_TIMEOUT)?;
        parse_markets(resp, &self.config.quote_assets)
    }

    fn fetch_candles(&self, symbol: &str, request: &CandleRequest) -> Result<FetchResult, DataError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("resolution", request.resolution.api_value()),
            ("from", request.from.timestamp().to_string()),
            ("to", request.to.timestamp().to_string()),
        ];
        let resp: HistoryResponse =
            self.get_json(&self.url("/v1/udf/history"), &query, HISTORY_TIMEOUT)?;

        Ok(FetchResult {
            symbol: symbol.to_string(),
            candles: parse_history(symbol, resp)?,
            source: DataSource::Wallex,
        })
    }
}

/// Upper-case in the sense of `str.isupper`: at least one cased character and
/// no lower-case ones.
fn is_upper(symbol: &str) -> bool {
    symbol.chars().any(char::is_uppercase) && !symbol.chars().any(char::is_lowercase)
}

/// Whether a listed symbol should be scanned.
pub fn is_tradable_symbol(symbol: &str, quote_assets: &[String]) -> bool {
    symbol.len() >= 5
        && is_upper(symbol)
        && quote_assets.iter().any(|q| symbol.ends_with(q.as_str()))
}

fn parse_markets(resp: MarketsResponse, quote_assets: &[String]) -> Result<Vec<String>, DataError> {
    let symbols = match (resp.success, resp.result) {
        (Some(true), Some(MarketsResult { symbols: Some(symbols) })) => symbols,
        _ => {
            return Err(DataError::ResponseFormatChanged(
                "unexpected markets response structure".into(),
            ))
        }
    };

    Ok(symbols
        .into_keys()
        .filter(|s| is_tradable_symbol(s, quote_assets))
        .collect())
}

fn parse_history(symbol: &str, resp: HistoryResponse) -> Result<Vec<Candle>, DataError> {
    let no_data = || DataError::NoData {
        symbol: symbol.to_string(),
    };

    if resp.s != "ok" {
        return Err(no_data());
    }

    let column = |values: Option<Vec<Numeric>>| values.filter(|v| !v.is_empty()).ok_or_else(no_data);
    let t = column(resp.t)?;
    let o = column(resp.o)?;
    let h = column(resp.h)?;
    let l = column(resp.l)?;
    let c = column(resp.c)?;

    let n = t.len();
    if [o.len(), h.len(), l.len(), c.len()].iter().any(|&len| len != n) {
        return Err(DataError::ResponseFormatChanged(format!(
            "column lengths differ for {symbol}"
        )));
    }

    let number = |v: &Numeric, what: &str, i: usize| {
        v.as_f64().ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("unparsable {what} at row {i} for {symbol}"))
        })
    };

    (0..n)
        .map(|i| -> Result<Candle, DataError> {
            let ts = number(&t[i], "timestamp", i)? as i64;
            let timestamp = DateTime::from_timestamp(ts, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp {ts} for {symbol}"))
            })?;
            Ok(Candle::new(
                timestamp,
                number(&o[i], "open", i)?,
                number(&h[i], "high", i)?,
                number(&l[i], "low", i)?,
                number(&c[i], "close", i)?,
            ))
        })
        .collect()
}
