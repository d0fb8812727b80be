use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A single OHLCV candle (kline) over one interval bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// The last `count` candles of a sequence ordered oldest to newest.
pub fn most_recent(candles: &[Candle], count: usize) -> &[Candle] {
    let start = candles.len().saturating_sub(count);
    &candles[start..]
}
