use std::collections::HashSet;
use std::time::Duration;

use crate::error::MonitorError;
use crate::symbol::Symbol;

pub const BINANCE_BASE_URL: &str = "https://api.binance.com/api/v3";

pub const DEFAULT_SYMBOLS: [&str; 5] = ["BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "SOLUSDT"];
pub const DEFAULT_INTERVAL: &str = "5m";
pub const DEFAULT_REFRESH_SECS: u64 = 300;

/// Candles fetched per symbol by the console printer.
pub const CONSOLE_CANDLE_DEPTH: u32 = 5;
/// Candles fetched per symbol by the dashboard (enough to chart).
pub const CHART_CANDLE_DEPTH: u32 = 30;
/// Largest `limit` the klines endpoint accepts.
pub const MAX_CANDLE_DEPTH: u32 = 1000;

/// Kline intervals understood by the exchange.
pub const SUPPORTED_INTERVALS: [&str; 16] = [
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// Startup configuration for one monitor run. Not reloadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub symbols: Vec<Symbol>,
    pub interval: String,
    pub refresh_period: Duration,
    pub candle_depth: u32,
    pub base_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: DEFAULT_INTERVAL.to_string(),
            refresh_period: Duration::from_secs(DEFAULT_REFRESH_SECS),
            candle_depth: CONSOLE_CANDLE_DEPTH,
            base_url: BINANCE_BASE_URL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Defaults for the console printer.
    pub fn console() -> Self {
        Self::default()
    }

    /// Defaults for the dashboard, which charts a deeper candle history.
    pub fn dashboard() -> Self {
        Self {
            candle_depth: CHART_CANDLE_DEPTH,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.symbols.is_empty() {
            return Err(MonitorError::InvalidConfig(
                "at least one symbol is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol) {
                return Err(MonitorError::InvalidConfig(format!(
                    "duplicate symbol {symbol}"
                )));
            }
        }

        if !SUPPORTED_INTERVALS.contains(&self.interval.as_str()) {
            return Err(MonitorError::InvalidConfig(format!(
                "unsupported interval '{}'. Expected one of: {}",
                self.interval,
                SUPPORTED_INTERVALS.join(", ")
            )));
        }

        if self.refresh_period.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "refresh period must be greater than zero".into(),
            ));
        }

        if !(1..=MAX_CANDLE_DEPTH).contains(&self.candle_depth) {
            return Err(MonitorError::InvalidConfig(format!(
                "candle depth must be between 1 and {MAX_CANDLE_DEPTH}, got {}",
                self.candle_depth
            )));
        }

        if self.base_url.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("base URL is empty".into()));
        }

        Ok(())
    }
}

fn default_symbols() -> Vec<Symbol> {
    DEFAULT_SYMBOLS
        .iter()
        .filter_map(|s| Symbol::new(*s).ok())
        .collect()
}
