use chrono::Local;
use market_monitor_core::candle::Candle;
use market_monitor_core::format::{TICK_LABEL_STEP, Trend, price_decimals, tick_labels};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph, Row, Table, Tabs};
use rust_decimal::prelude::ToPrimitive;

use super::state::{DashboardState, SymbolCard, View};

const CARD_HEIGHT: u16 = 8;
const STATS_WIDTH: u16 = 30;
const HEADER_BG: Color = Color::Rgb(44, 62, 80);
const CARD_ACCENT: Color = Color::Rgb(52, 152, 219);

pub fn draw(frame: &mut Frame, state: &DashboardState) {
    let [header, tabs, body, status] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    draw_header(frame, header, state);
    draw_tabs(frame, tabs, state);
    match state.view {
        View::Overview => draw_overview(frame, body, state),
        View::Chart => draw_chart(frame, body, state),
    }
    draw_status(frame, status, state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let updated = state
        .last_update
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "never".to_string());

    let text = vec![
        Line::from(Span::styled(
            "MARKET DATA MONITOR",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Last update: {updated}")),
    ];
    let header = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(HEADER_BG))
        .block(Block::bordered());
    frame.render_widget(header, area);
}

fn draw_tabs(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let tabs = Tabs::new(vec!["Overview", "Chart"])
        .select(state.view.index())
        .block(Block::bordered())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn draw_overview(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let mut constraints = vec![Constraint::Length(CARD_HEIGHT); state.cards.len()];
    constraints.push(Constraint::Min(0));
    let areas = Layout::vertical(constraints).split(area);

    for (card, card_area) in state.cards.iter().zip(areas.iter()) {
        draw_card(frame, *card_area, card);
    }
}

fn draw_card(frame: &mut Frame, area: Rect, card: &SymbolCard) {
    let title = if card.stale && card.ticker.is_some() {
        format!(" {} (stale) ", card.symbol)
    } else {
        format!(" {} ", card.symbol)
    };
    let block = Block::bordered()
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .bg(CARD_ACCENT)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(CARD_ACCENT));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [stats_area, table_area] =
        Layout::horizontal([Constraint::Length(STATS_WIDTH), Constraint::Min(0)]).areas(inner);

    let label = Style::default().add_modifier(Modifier::BOLD);
    let stats = match &card.ticker {
        Some(ticker) => {
            let change_color = match ticker.trend {
                Trend::Up => Color::Green,
                Trend::Down => Color::Red,
            };
            vec![
                stat_line("Price:", &ticker.price, label, Style::default()),
                stat_line(
                    "24h change:",
                    &ticker.change,
                    label,
                    Style::default().fg(change_color),
                ),
                stat_line("24h volume:", &ticker.volume, label, Style::default()),
                stat_line("24h high:", &ticker.high, label, Style::default()),
                stat_line("24h low:", &ticker.low, label, Style::default()),
            ]
        }
        None if card.stale => vec![Line::from(Span::styled(
            "Unavailable",
            Style::default().fg(Color::Red),
        ))],
        None => vec![Line::from("Loading...")],
    };
    frame.render_widget(Paragraph::new(stats), stats_area);

    let header = Row::new(["Time", "Open", "High", "Low", "Close", "Volume"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = card.rows.iter().map(|r| Row::new(r.cells()));
    let widths = [
        Constraint::Length(9),
        Constraint::Min(12),
        Constraint::Min(12),
        Constraint::Min(12),
        Constraint::Min(12),
        Constraint::Min(12),
    ];
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    frame.render_widget(table, table_area);
}

fn stat_line<'a>(label: &'a str, value: &'a str, label_style: Style, value_style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<13}"), label_style),
        Span::styled(value, value_style),
    ])
}

fn draw_chart(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let [selector_area, chart_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);

    let mut selector = vec![Span::raw("Symbol (\u{2190}/\u{2192}): ")];
    for card in &state.cards {
        let style = if Some(&card.symbol) == state.selected_symbol() {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        selector.push(Span::styled(format!(" {} ", card.symbol), style));
        selector.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(selector)), selector_area);

    let Some(symbol) = state.selected_symbol() else {
        return;
    };

    match state.chart_series() {
        Some(Ok(candles)) if !candles.is_empty() => {
            draw_price_chart(frame, chart_area, symbol.as_str(), candles)
        }
        Some(_) => frame.render_widget(
            Block::bordered().title(format!(" Failed to load data for {symbol} ")),
            chart_area,
        ),
        None => frame.render_widget(
            Block::bordered().title(format!(" Loading data for {symbol} ")),
            chart_area,
        ),
    }
}

/// Closing price against candle index; x labels are every 5th open time.
fn draw_price_chart(frame: &mut Frame, area: Rect, symbol: &str, candles: &[Candle]) {
    let points: Vec<(f64, f64)> = candles
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.close.to_f64().map(|close| (i as f64, close)))
        .collect();

    let (low, high) = y_bounds(&points);
    let decimals = candles
        .last()
        .map(|c| price_decimals(c.close) as usize)
        .unwrap_or(2);
    let y_labels: Vec<Span> = [low, (low + high) / 2.0, high]
        .iter()
        .map(|v| Span::raw(format!("{v:.decimals$}")))
        .collect();
    let (x_bounds, x_labels) = x_axis(
        candles.len(),
        tick_labels(candles, TICK_LABEL_STEP),
        TICK_LABEL_STEP,
    );
    let x_labels: Vec<Span> = x_labels.into_iter().map(Span::raw).collect();

    let dataset = Dataset::default()
        .name("Close")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(CARD_ACCENT))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::bordered().title(format!(" Price history for {symbol} ")))
        .x_axis(
            Axis::default()
                .title("Time (UTC)")
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Price (USDT)")
                .style(Style::default().fg(Color::Gray))
                .bounds([low, high])
                .labels(y_labels),
        );
    frame.render_widget(chart, area);
}

/// X bounds plus labels for ratatui's evenly spaced axis. Labels sit every
/// `step` candles ending on the newest one; when that leaves the oldest
/// candles unlabelled the axis starts one step earlier under a blank label.
fn x_axis(len: usize, ticks: Vec<(usize, String)>, step: usize) -> ([f64; 2], Vec<String>) {
    let x_max = len.saturating_sub(1) as f64;
    let first = ticks.first().map_or(0, |(i, _)| *i);
    let mut labels: Vec<String> = ticks.into_iter().map(|(_, label)| label).collect();
    let x_min = if first > 0 {
        labels.insert(0, String::new());
        first as f64 - step as f64
    } else {
        0.0
    };
    if x_max <= x_min {
        return ([x_min, x_min + 1.0], labels);
    }
    ([x_min, x_max], labels)
}

/// Min/max of the series with a little headroom; flat series get a 1% band.
fn y_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
            (lo.min(y), hi.max(y))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min {
        (max - min) * 0.05
    } else {
        (max.abs() * 0.01).max(f64::EPSILON)
    };
    (min - pad, max + pad)
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let line = Line::from(vec![
        Span::raw(state.status.as_str()),
        Span::styled(
            "  [r] update now  [Tab] switch view  [\u{2190}/\u{2192}] chart symbol  [q] quit",
            Style::default().fg(Color::Gray),
        ),
    ]);
    let status = Paragraph::new(line)
        .style(Style::default().fg(Color::White).bg(Color::Rgb(52, 73, 94)))
        .block(Block::bordered());
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::{sample_candles, sample_ticker};
    use chrono::{TimeZone, Utc};
    use market_monitor_core::report::{CycleReport, FailureKind, SymbolReport, Unavailable};
    use market_monitor_core::symbol::Symbol;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn screen(state: &DashboardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 60)).unwrap();
        terminal.draw(|f| draw(f, state)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn state_with_data() -> DashboardState {
        let symbols = vec![
            Symbol::new("BTCUSDT").unwrap(),
            Symbol::new("ETHUSDT").unwrap(),
        ];
        let mut state = DashboardState::new(&symbols, Duration::from_secs(300));
        let failure = Unavailable::new(FailureKind::Network, "timeout");
        state.apply(CycleReport {
            started_at: Utc.with_ymd_and_hms(2025, 1, 15, 3, 33, 33).unwrap(),
            symbols: vec![
                SymbolReport {
                    symbol: symbols[0].clone(),
                    ticker: Ok(sample_ticker(dec!(67012.345))),
                    candles: Ok(sample_candles(30)),
                },
                SymbolReport {
                    symbol: symbols[1].clone(),
                    ticker: Err(failure.clone()),
                    candles: Err(failure),
                },
            ],
        });
        state
    }

    #[test]
    fn overview_shows_cards_and_newest_candles() {
        let text = screen(&state_with_data());
        assert!(text.contains("MARKET DATA MONITOR"));
        assert!(text.contains("BTCUSDT"));
        assert!(text.contains("67012.35"));
        assert!(text.contains("+1.23%"));
        assert!(text.contains("12:25:00"));
        assert!(!text.contains("12:00:00"));
        assert!(text.contains("Unavailable"));
        assert!(text.contains("1 symbol(s) unavailable"));
    }

    #[test]
    fn chart_view_draws_selected_symbol() {
        let mut state = state_with_data();
        state.toggle_view();
        let text = screen(&state);
        assert!(text.contains("Price history for BTCUSDT"));
        assert!(text.contains("10:20"));

        state.select_next();
        let text = screen(&state);
        assert!(text.contains("Failed to load data for ETHUSDT"));
    }

    #[test]
    fn rightmost_chart_label_is_the_newest_candle() {
        let mut state = state_with_data();
        state.toggle_view();
        let text = screen(&state);

        // 30 candles from 10:00 every 5 minutes: the newest opens at 12:25.
        let label_row = text
            .lines()
            .find(|line| line.contains("10:20") && line.contains("12:00"))
            .unwrap();
        let times: Vec<&str> = label_row
            .split(|c: char| c.is_whitespace() || c == '\u{2502}')
            .filter(|t| t.len() == 5 && t.as_bytes()[2] == b':')
            .collect();
        assert_eq!(times, vec!["10:20", "10:45", "11:10", "11:35", "12:00", "12:25"]);
    }

    #[test]
    fn x_axis_spacing_matches_candle_indices() {
        let label = |i: usize| (i, format!("t{i}"));

        // Labels at 4, 9, .., 29 plus a blank one step before the first.
        let ticks = (0..6).map(|k| label(4 + 5 * k)).collect();
        let (bounds, labels) = x_axis(30, ticks, 5);
        assert_eq!(bounds, [-1.0, 29.0]);
        assert_eq!(labels.len(), 7);
        assert_eq!(labels[0], "");
        assert_eq!(labels.last().unwrap(), "t29");
        let spacing = (bounds[1] - bounds[0]) / (labels.len() - 1) as f64;
        assert_eq!(spacing, 5.0);

        // Evenly divisible series start at the first candle.
        let ticks = (0..6).map(|k| label(5 * k)).collect();
        let (bounds, labels) = x_axis(26, ticks, 5);
        assert_eq!(bounds, [0.0, 25.0]);
        assert_eq!(labels.first().unwrap(), "t0");

        let (bounds, _) = x_axis(1, vec![label(0)], 5);
        assert_eq!(bounds, [0.0, 1.0]);
    }

    #[test]
    fn y_bounds_pad_flat_series() {
        let (low, high) = y_bounds(&[(0.0, 100.0), (1.0, 100.0)]);
        assert!(low < 100.0 && high > 100.0);
        assert_eq!(y_bounds(&[]), (0.0, 1.0));
    }
}
