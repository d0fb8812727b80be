use rust_decimal::Decimal;

/// Point-in-time 24-hour statistics for one trading pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerSnapshot {
    pub last_price: Decimal,
    pub price_change_percent: Decimal,
    pub volume: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
}
