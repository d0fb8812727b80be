use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_monitor_core::candle::{self, Candle};
use market_monitor_core::config::BINANCE_BASE_URL;
use market_monitor_core::symbol::Symbol;
use market_monitor_core::ticker::TickerSnapshot;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::MarketDataClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("market-monitor/", env!("CARGO_PKG_VERSION"));

/// Binance spot REST client. Public endpoints only, no authentication.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    interval: String,
}

impl BinanceClient {
    /// Client for the public Binance API with the given kline interval (e.g. `5m`).
    pub fn new(interval: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(BINANCE_BASE_URL, interval)
    }

    /// Create with a custom base URL (mirrors, testing).
    pub fn with_base_url(
        base_url: impl Into<String>,
        interval: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            interval: interval.into(),
        })
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            ..self
        })
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// Issue one GET and decode a JSON body. Non-2xx statuses become `Api` errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// `/ticker/24hr` body. Binance sends numbers as strings; extra fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    last_price: String,
    price_change_percent: String,
    volume: String,
    high_price: String,
    low_price: String,
}

impl RawTicker {
    fn to_snapshot(&self) -> Result<TickerSnapshot, ProviderError> {
        Ok(TickerSnapshot {
            last_price: parse_decimal("lastPrice", &self.last_price)?,
            price_change_percent: parse_decimal("priceChangePercent", &self.price_change_percent)?,
            volume: parse_decimal("volume", &self.volume)?,
            high_price: parse_decimal("highPrice", &self.high_price)?,
            low_price: parse_decimal("lowPrice", &self.low_price)?,
        })
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, ProviderError> {
    Decimal::from_str(raw)
        .map_err(|e| ProviderError::Parse(format!("invalid {field} '{raw}': {e}")))
}

fn millis_to_utc(field: &str, value: &Value) -> Result<DateTime<Utc>, ProviderError> {
    let millis = value
        .as_i64()
        .ok_or_else(|| ProviderError::Parse(format!("{field} is not an integer: {value}")))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ProviderError::Parse(format!("{field} out of range: {millis}")))
}

fn decimal_field(field: &str, value: &Value) -> Result<Decimal, ProviderError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::Parse(format!("{field} is not a string: {value}")))?;
    parse_decimal(field, raw)
}

/// Positional kline row: `[openTime, open, high, low, close, volume, closeTime, ...]`.
fn parse_kline(row: &[Value]) -> Result<Candle, ProviderError> {
    if row.len() < 7 {
        return Err(ProviderError::Parse(format!(
            "kline row has {} field(s), expected at least 7",
            row.len()
        )));
    }

    Ok(Candle {
        open_time: millis_to_utc("openTime", &row[0])?,
        open: decimal_field("open", &row[1])?,
        high: decimal_field("high", &row[2])?,
        low: decimal_field("low", &row[3])?,
        close: decimal_field("close", &row[4])?,
        volume: decimal_field("volume", &row[5])?,
        close_time: millis_to_utc("closeTime", &row[6])?,
    })
}

#[async_trait]
impl MarketDataClient for BinanceClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<TickerSnapshot, ProviderError> {
        let raw: RawTicker = self
            .get_json("/ticker/24hr", &[("symbol", symbol.as_str())])
            .await?;
        raw.to_snapshot()
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        limit: u32,
    ) -> Result<Vec<Candle>, ProviderError> {
        let limit_param = limit.to_string();
        let rows: Vec<Vec<Value>> = self
            .get_json(
                "/klines",
                &[
                    ("symbol", symbol.as_str()),
                    ("interval", self.interval.as_str()),
                    ("limit", limit_param.as_str()),
                ],
            )
            .await?;

        let candles = rows
            .iter()
            .map(|row| parse_kline(row))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(%symbol, count = candles.len(), "parsed klines");
        Ok(candle::most_recent(&candles, limit as usize).to_vec())
    }
}
