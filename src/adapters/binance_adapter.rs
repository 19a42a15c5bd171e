//! Binance REST market-data adapter.
//!
//! Symbols are bare assets ("BTC"); the adapter appends the configured quote
//! asset to build the exchange pair. Spot and USD-M futures share the same
//! kline and 24h-ticker payloads and differ only in base URL.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::domain::config::MarketType;
use crate::domain::error::WatchError;
use crate::domain::kline::Kline;
use crate::domain::quote::PriceQuote;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;

pub const SPOT_BASE_URL: &str = "https://api.binance.com/api/v3";
pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com/fapi/v1";
pub const DEFAULT_QUOTE_ASSET: &str = "USDT";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    #[serde(default)]
    price_change_percent: String,
    #[serde(default)]
    volume: String,
}

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
    quote_asset: String,
}

impl BinanceAdapter {
    pub fn new(base_url: &str, quote_asset: &str, timeout: Duration) -> Result<Self, WatchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::fetch("*", format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            quote_asset: quote_asset.to_uppercase(),
        })
    }

    /// Build from the `[binance]` section, picking the base URL for `market`.
    pub fn from_config(
        config: &dyn ConfigPort,
        market: MarketType,
        timeout: Duration,
    ) -> Result<Self, WatchError> {
        let base_url = match market {
            MarketType::Spot => config
                .get_non_empty("binance", "spot_url")
                .unwrap_or_else(|| SPOT_BASE_URL.to_string()),
            MarketType::Futures => config
                .get_non_empty("binance", "futures_url")
                .unwrap_or_else(|| FUTURES_BASE_URL.to_string()),
        };
        let quote_asset = config
            .get_non_empty("binance", "quote_asset")
            .unwrap_or_else(|| DEFAULT_QUOTE_ASSET.to_string());

        Self::new(&base_url, &quote_asset, timeout)
    }

    pub fn pair(&self, symbol: &str) -> String {
        format!("{}{}", symbol.to_uppercase(), self.quote_asset)
    }

    async fn get_json(
        &self,
        symbol: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, WatchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WatchError::Timeout {
                        what: format!("{} {}", path, symbol),
                    }
                } else {
                    WatchError::fetch(symbol, e)
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WatchError::fetch(symbol, format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(api) => WatchError::UpstreamApi {
                    code: api.code,
                    message: api.msg,
                },
                Err(_) => WatchError::fetch(symbol, format!("HTTP {}", status)),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| WatchError::fetch(symbol, format!("invalid JSON: {}", e)))
    }
}

/// Binance encodes prices and volumes as strings and times as integers.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a kline array payload. Short or malformed rows are skipped.
pub fn parse_klines(payload: &Value) -> Option<Vec<Kline>> {
    let rows = payload.as_array()?;
    Some(
        rows.iter()
            .filter_map(|row| {
                let fields = row.as_array()?;
                if fields.len() < 7 {
                    return None;
                }
                Some(Kline {
                    open_time: as_i64(&fields[0])?,
                    open: as_f64(&fields[1])?,
                    high: as_f64(&fields[2])?,
                    low: as_f64(&fields[3])?,
                    close: as_f64(&fields[4])?,
                    volume: as_f64(&fields[5])?,
                    close_time: as_i64(&fields[6])?,
                })
            })
            .collect(),
    )
}

#[async_trait]
impl MarketDataPort for BinanceAdapter {
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Kline>, WatchError> {
        let payload = self
            .get_json(
                symbol,
                "/klines",
                &[
                    ("symbol", self.pair(symbol)),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let klines = parse_klines(&payload)
            .ok_or_else(|| WatchError::fetch(symbol, "kline payload is not an array"))?;
        tracing::debug!(symbol, interval, count = klines.len(), "fetched klines");
        Ok(klines)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, WatchError> {
        let payload = self
            .get_json(symbol, "/ticker/24hr", &[("symbol", self.pair(symbol))])
            .await?;

        let ticker: Ticker24h = serde_json::from_value(payload)
            .map_err(|e| WatchError::fetch(symbol, format!("invalid ticker: {}", e)))?;
        let price = ticker
            .last_price
            .parse::<f64>()
            .map_err(|_| WatchError::fetch(symbol, format!("invalid lastPrice '{}'", ticker.last_price)))?;

        Ok(PriceQuote {
            symbol: symbol.to_uppercase(),
            price,
            change_24h: ticker.price_change_percent.parse().unwrap_or(0.0),
            volume: ticker.volume.parse().unwrap_or(0.0),
            timestamp: Utc::now(),
        })
    }
}
