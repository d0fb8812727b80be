//! Display formatting shared by the console printer and the dashboard.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::candle::Candle;

/// Candle rows shown per symbol, whatever the fetch depth.
pub const DISPLAY_CANDLES: usize = 5;

/// Chart x-axis gets one tick label per this many points.
pub const TICK_LABEL_STEP: usize = 5;

/// Direction of the 24h change, used to pick an indicator color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Zero counts as up.
    pub fn from_change(change: Decimal) -> Self {
        if change >= Decimal::ZERO {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Decimal places for a price, growing as the price gets smaller.
pub fn price_decimals(price: Decimal) -> u32 {
    let abs = price.abs();
    if abs < Decimal::new(1, 1) {
        8
    } else if abs < Decimal::ONE {
        6
    } else if abs < Decimal::ONE_HUNDRED {
        4
    } else {
        2
    }
}

/// Round half away from zero and pad to exactly `dp` places.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Price with magnitude-scaled precision.
pub fn format_price(price: Decimal) -> String {
    format_fixed(price, price_decimals(price))
}

/// Signed percent with two decimals, e.g. `+1.23%`.
pub fn format_percent(change: Decimal) -> String {
    let sign = if change < Decimal::ZERO { '-' } else { '+' };
    format!("{sign}{}%", format_fixed(change.abs(), 2))
}

pub fn format_volume(volume: Decimal) -> String {
    format_fixed(volume, 2)
}

pub fn format_clock(time: DateTime<Utc>) -> String {
    time.format("%H:%M:%S").to_string()
}

/// `(index, "HH:MM")` for every `step`-th candle, counted back from the newest
/// so the last candle always carries a label. Ascending by index.
pub fn tick_labels(candles: &[Candle], step: usize) -> Vec<(usize, String)> {
    let mut labels: Vec<(usize, String)> = candles
        .iter()
        .enumerate()
        .rev()
        .step_by(step.max(1))
        .map(|(i, c)| (i, c.open_time.format("%H:%M").to_string()))
        .collect();
    labels.reverse();
    labels
}
