//! Display state owned by the UI loop. Only `apply` changes it after a cycle.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use market_monitor_core::candle::{self, Candle};
use market_monitor_core::format::{
    DISPLAY_CANDLES, Trend, format_clock, format_fixed, format_percent, format_price,
    format_volume,
};
use market_monitor_core::report::{CycleReport, Unavailable};
use market_monitor_core::symbol::Symbol;
use market_monitor_core::ticker::TickerSnapshot;

use crate::scheduler::Phase;

const TABLE_DECIMALS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Overview,
    Chart,
}

impl View {
    pub fn index(self) -> usize {
        match self {
            Self::Overview => 0,
            Self::Chart => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Overview => Self::Chart,
            Self::Chart => Self::Overview,
        }
    }
}

/// Pre-formatted ticker values for a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerView {
    pub price: String,
    pub change: String,
    pub trend: Trend,
    pub volume: String,
    pub high: String,
    pub low: String,
}

impl From<&TickerSnapshot> for TickerView {
    fn from(ticker: &TickerSnapshot) -> Self {
        Self {
            price: format_price(ticker.last_price),
            change: format_percent(ticker.price_change_percent),
            trend: Trend::from_change(ticker.price_change_percent),
            volume: format_volume(ticker.volume),
            high: format_price(ticker.high_price),
            low: format_price(ticker.low_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRow {
    pub time: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl CandleRow {
    pub fn cells(&self) -> [String; 6] {
        [
            self.time.clone(),
            self.open.clone(),
            self.high.clone(),
            self.low.clone(),
            self.close.clone(),
            self.volume.clone(),
        ]
    }
}

/// The most recent candles, newest first, capped at `DISPLAY_CANDLES`.
pub fn candle_rows(candles: &[Candle]) -> Vec<CandleRow> {
    candle::most_recent(candles, DISPLAY_CANDLES)
        .iter()
        .rev()
        .map(|c| CandleRow {
            time: format_clock(c.open_time),
            open: format_fixed(c.open, TABLE_DECIMALS),
            high: format_fixed(c.high, TABLE_DECIMALS),
            low: format_fixed(c.low, TABLE_DECIMALS),
            close: format_fixed(c.close, TABLE_DECIMALS),
            volume: format_volume(c.volume),
        })
        .collect()
}

/// One symbol's overview card. Keeps the last good values when a fetch fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolCard {
    pub symbol: Symbol,
    /// `None` until the first successful ticker fetch.
    pub ticker: Option<TickerView>,
    pub rows: Vec<CandleRow>,
    /// Set when the latest cycle failed for this symbol.
    pub stale: bool,
}

#[derive(Debug)]
pub struct DashboardState {
    pub cards: Vec<SymbolCard>,
    series: HashMap<Symbol, Result<Vec<Candle>, Unavailable>>,
    selected: usize,
    pub view: View,
    pub last_update: Option<DateTime<Utc>>,
    pub status: String,
    period: Duration,
}

impl DashboardState {
    pub fn new(symbols: &[Symbol], period: Duration) -> Self {
        Self {
            cards: symbols
                .iter()
                .map(|symbol| SymbolCard {
                    symbol: symbol.clone(),
                    ticker: None,
                    rows: Vec::new(),
                    stale: false,
                })
                .collect(),
            series: HashMap::new(),
            selected: 0,
            view: View::Overview,
            last_update: None,
            status: "Monitoring data...".to_string(),
            period,
        }
    }

    /// Fold one completed cycle into the display.
    pub fn apply(&mut self, report: CycleReport) {
        let failures = report.failures();

        for entry in report.symbols {
            let complete = entry.is_complete();
            let Some(card) = self.cards.iter_mut().find(|c| c.symbol == entry.symbol) else {
                continue;
            };

            card.stale = !complete;
            if let Ok(ticker) = &entry.ticker {
                card.ticker = Some(TickerView::from(ticker));
            }
            if let Ok(candles) = &entry.candles {
                card.rows = candle_rows(candles);
            }
            self.series.insert(entry.symbol, entry.candles);
        }

        self.last_update = Some(report.started_at);
        let next = self.period.as_secs();
        self.status = if failures == 0 {
            format!("Data updated. Next update in {next} seconds.")
        } else {
            format!("Data updated, {failures} symbol(s) unavailable. Next update in {next} seconds.")
        };
    }

    pub fn set_updating(&mut self) {
        self.status = "Updating data...".to_string();
    }

    /// Reflect a background fetch in the status bar; `apply` replaces it.
    pub fn observe_phase(&mut self, phase: Phase) {
        if phase == Phase::Fetching {
            self.set_updating();
        }
    }

    pub fn toggle_view(&mut self) {
        self.view = self.view.toggled();
    }

    pub fn selected_symbol(&self) -> Option<&Symbol> {
        self.cards.get(self.selected).map(|c| &c.symbol)
    }

    pub fn select_next(&mut self) {
        if !self.cards.is_empty() {
            self.selected = (self.selected + 1) % self.cards.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.cards.is_empty() {
            self.selected = (self.selected + self.cards.len() - 1) % self.cards.len();
        }
    }

    /// Candles for the chart. `None` before the first cycle for that symbol.
    pub fn chart_series(&self) -> Option<&Result<Vec<Candle>, Unavailable>> {
        self.selected_symbol().and_then(|s| self.series.get(s))
    }
}
