//! Console printer: clears the terminal and prints every symbol as columnar text.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use market_monitor_core::candle::{self, Candle};
use market_monitor_core::format::{
    DISPLAY_CANDLES, format_clock, format_fixed, format_percent, format_volume,
};
use market_monitor_core::report::{CycleReport, SymbolReport};
use market_monitor_core::ticker::TickerSnapshot;

use crate::scheduler::PresentationSink;

const RULE_WIDTH: usize = 80;
const FIXED_DECIMALS: u32 = 8;

pub struct ConsolePrinter<W: Write> {
    out: W,
    period: Duration,
    clear_screen: bool,
}

impl<W: Write> ConsolePrinter<W> {
    pub fn new(out: W, period: Duration) -> Self {
        Self {
            out,
            period,
            clear_screen: true,
        }
    }

    /// Skip the clear-screen escape codes (plain captured output).
    pub fn without_clear(mut self) -> Self {
        self.clear_screen = false;
        self
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_report(&mut self, report: &CycleReport) -> Result<()> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "\n{rule}")?;
        writeln!(
            self.out,
            "BINANCE MARKET DATA - {}",
            report
                .started_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(self.out, "{rule}")?;

        for entry in &report.symbols {
            self.write_symbol(entry)?;
        }

        writeln!(
            self.out,
            "\nNext update in {} seconds. Press Ctrl+C to exit.",
            self.period.as_secs()
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn write_symbol(&mut self, entry: &SymbolReport) -> Result<()> {
        let rule = "-".repeat(RULE_WIDTH);
        writeln!(self.out, "\n{rule}")?;
        writeln!(self.out, "SYMBOL: {}", entry.symbol)?;
        writeln!(self.out, "{rule}")?;

        match &entry.ticker {
            Ok(ticker) => self.write_ticker(ticker)?,
            Err(failure) => writeln!(self.out, "Ticker unavailable ({failure})")?,
        }

        match &entry.candles {
            Ok(candles) if candles.is_empty() => writeln!(self.out, "\nNo candles returned")?,
            Ok(candles) => {
                let recent = candle::most_recent(candles, DISPLAY_CANDLES);
                writeln!(self.out, "\nLast {} candles (UTC):", recent.len())?;
                for line in candle_table(recent) {
                    writeln!(self.out, "{line}")?;
                }
            }
            Err(failure) => writeln!(self.out, "\nCandles unavailable ({failure})")?,
        }

        writeln!(self.out)?;
        Ok(())
    }

    fn write_ticker(&mut self, ticker: &TickerSnapshot) -> Result<()> {
        writeln!(
            self.out,
            "Last price: {}",
            format_fixed(ticker.last_price, FIXED_DECIMALS)
        )?;
        writeln!(
            self.out,
            "24h change: {}",
            format_percent(ticker.price_change_percent)
        )?;
        writeln!(self.out, "24h volume: {}", format_volume(ticker.volume))?;
        writeln!(
            self.out,
            "24h high: {}",
            format_fixed(ticker.high_price, FIXED_DECIMALS)
        )?;
        writeln!(
            self.out,
            "24h low: {}",
            format_fixed(ticker.low_price, FIXED_DECIMALS)
        )?;
        Ok(())
    }
}

/// Right-aligned columns sized to the widest cell, header first.
fn candle_table(candles: &[Candle]) -> Vec<String> {
    let header = ["open_time", "open", "high", "low", "close", "volume"].map(String::from);
    let rows: Vec<[String; 6]> = candles
        .iter()
        .map(|c| {
            [
                format_clock(c.open_time),
                format_fixed(c.open, FIXED_DECIMALS),
                format_fixed(c.high, FIXED_DECIMALS),
                format_fixed(c.low, FIXED_DECIMALS),
                format_fixed(c.close, FIXED_DECIMALS),
                format_fixed(c.volume, FIXED_DECIMALS),
            ]
        })
        .collect();

    let mut widths = header.each_ref().map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    std::iter::once(&header)
        .chain(rows.iter())
        .map(|row| {
            row.iter()
                .zip(widths)
                .map(|(cell, width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

impl<W: Write> PresentationSink for ConsolePrinter<W> {
    fn render(&mut self, report: CycleReport) -> Result<()> {
        self.write_report(&report)
    }
}
