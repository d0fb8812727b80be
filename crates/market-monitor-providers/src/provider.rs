use async_trait::async_trait;
use market_monitor_core::candle::Candle;
use market_monitor_core::symbol::Symbol;
use market_monitor_core::ticker::TickerSnapshot;

use crate::error::ProviderError;

/// Read-only access to an exchange's market data.
///
/// Every call performs one fresh request; implementations never cache or
/// retry.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Client name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch the 24-hour ticker statistics for a symbol.
    async fn fetch_ticker(&self, symbol: &Symbol) -> Result<TickerSnapshot, ProviderError>;

    /// Fetch the `limit` most recent candles for a symbol, oldest first.
    async fn fetch_candles(&self, symbol: &Symbol, limit: u32)
    -> Result<Vec<Candle>, ProviderError>;
}
