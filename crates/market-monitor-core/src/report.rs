use std::fmt;

use chrono::{DateTime, Utc};

use crate::candle::Candle;
use crate::symbol::Symbol;
use crate::ticker::TickerSnapshot;

/// Why a symbol's data could not be produced this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection error, timeout or non-success HTTP status.
    Network,
    /// Malformed or missing field in the response body.
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network"),
            Self::Parse => f.write_str("parse"),
        }
    }
}

/// Marker for a ticker or candle slot with no data this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable {
    pub kind: FailureKind,
    pub message: String,
}

impl Unavailable {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

/// Everything fetched for one symbol in one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReport {
    pub symbol: Symbol,
    pub ticker: Result<TickerSnapshot, Unavailable>,
    /// Oldest to newest.
    pub candles: Result<Vec<Candle>, Unavailable>,
}

impl SymbolReport {
    pub fn is_complete(&self) -> bool {
        self.ticker.is_ok() && self.candles.is_ok()
    }
}

/// Immutable result of one fetch pass over every configured symbol.
///
/// Symbols appear in configured order. Reports are built fresh each cycle
/// and handed to a presentation sink by value.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub symbols: Vec<SymbolReport>,
}

impl CycleReport {
    /// Number of symbols with at least one unavailable slot.
    pub fn failures(&self) -> usize {
        self.symbols.iter().filter(|s| !s.is_complete()).count()
    }
}
