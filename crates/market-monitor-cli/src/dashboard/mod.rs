//! Full-screen terminal dashboard.
//!
//! The scheduler runs as a background task and posts each `CycleReport` over a
//! channel; the UI loop drains it between frames and is the only code that
//! touches `DashboardState`.

mod state;
mod ui;

use std::io::{self, IsTerminal, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use market_monitor_core::report::CycleReport;
use market_monitor_core::symbol::Symbol;
use market_monitor_providers::provider::MarketDataClient;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::scheduler::{PresentationSink, Scheduler, shutdown_channel};
use state::DashboardState;

const INPUT_POLL: Duration = Duration::from_millis(50);
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Posts completed cycles to the UI loop.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<CycleReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<CycleReport>) -> Self {
        Self { tx }
    }
}

impl PresentationSink for ChannelSink {
    fn render(&mut self, report: CycleReport) -> Result<()> {
        self.tx
            .send(report)
            .map_err(|_| anyhow!("dashboard is no longer receiving reports"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    Refresh,
    ToggleView,
    NextSymbol,
    PrevSymbol,
}

fn key_action(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Refresh),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleView),
        KeyCode::Right => Some(Action::NextSymbol),
        KeyCode::Left => Some(Action::PrevSymbol),
        _ => None,
    }
}

/// Raw mode + alternate screen for the lifetime of the value.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let terminal = restore_on_error(open_terminal, || restore_terminal(&mut io::stdout()))?;
        Ok(Self { terminal })
    }
}

fn open_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")
}

fn restore_terminal<W: Write>(out: &mut W) {
    let _ = disable_raw_mode();
    let _ = execute!(out, LeaveAlternateScreen);
}

/// Runs `setup`, undoing partial terminal changes with `restore` if it fails.
fn restore_on_error<T>(setup: impl FnOnce() -> Result<T>, restore: impl FnOnce()) -> Result<T> {
    setup().inspect_err(|_| restore())
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        restore_terminal(self.terminal.backend_mut());
        let _ = self.terminal.show_cursor();
    }
}

pub async fn run<C>(scheduler: Arc<Scheduler<C>>, symbols: &[Symbol]) -> Result<()>
where
    C: MarketDataClient + 'static,
{
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("the dashboard needs an interactive terminal (TTY); use `console` instead");
    }

    let mut session = TerminalSession::enter()?;
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let (shutdown_handle, shutdown) = shutdown_channel();

    let worker = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink::new(report_tx);
            scheduler.run(&mut sink, shutdown).await;
        })
    };

    let mut state = DashboardState::new(symbols, scheduler.period());
    let result = ui_loop(&mut session, &scheduler, &mut state, &mut report_rx).await;

    info!("dashboard closing");
    shutdown_handle.trigger();
    drop(session);

    match tokio::time::timeout(WORKER_JOIN_TIMEOUT, worker).await {
        Ok(Ok(())) => info!("scheduler worker exited"),
        Ok(Err(e)) => warn!("scheduler worker failed: {e}"),
        Err(_) => warn!(
            "scheduler worker still busy after {}s; exiting without it",
            WORKER_JOIN_TIMEOUT.as_secs()
        ),
    }

    result
}

async fn ui_loop<C: MarketDataClient>(
    session: &mut TerminalSession,
    scheduler: &Scheduler<C>,
    state: &mut DashboardState,
    reports: &mut mpsc::UnboundedReceiver<CycleReport>,
) -> Result<()> {
    let mut phase = scheduler.phase();
    loop {
        if phase.has_changed().unwrap_or(false) {
            state.observe_phase(*phase.borrow_and_update());
        }
        while let Ok(report) = reports.try_recv() {
            state.apply(report);
        }

        session.terminal.draw(|f| ui::draw(f, state))?;

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match key_action(key) {
            Some(Action::Quit) => return Ok(()),
            Some(Action::Refresh) => {
                info!("manual refresh requested");
                state.set_updating();
                session.terminal.draw(|f| ui::draw(f, state))?;
                let report = scheduler.run_cycle().await;
                state.apply(report);
            }
            Some(Action::ToggleView) => state.toggle_view(),
            Some(Action::NextSymbol) => state.select_next(),
            Some(Action::PrevSymbol) => state.select_prev(),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::tests::FakeClient;
    use crate::scheduler::{Phase, Scheduler};
    use market_monitor_core::config::MonitorConfig;

    #[test]
    fn keys_map_to_actions() {
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(key_action(press(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(key_action(press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(key_action(press(KeyCode::Char('r'))), Some(Action::Refresh));
        assert_eq!(key_action(press(KeyCode::Tab)), Some(Action::ToggleView));
        assert_eq!(key_action(press(KeyCode::Right)), Some(Action::NextSymbol));
        assert_eq!(key_action(press(KeyCode::Left)), Some(Action::PrevSymbol));
        assert_eq!(key_action(press(KeyCode::Char('x'))), None);
        assert_eq!(
            key_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn key_release_is_ignored() {
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(key_action(key), None);
    }

    #[test]
    fn failed_terminal_setup_is_restored() {
        let mut restored = false;
        let result: Result<()> = restore_on_error(|| Err(anyhow!("no tty")), || restored = true);
        assert!(result.is_err());
        assert!(restored);

        let mut restored = false;
        let value = restore_on_error(|| Ok(7), || restored = true).unwrap();
        assert_eq!(value, 7);
        assert!(!restored);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_replaces_updating_status_with_fresh_data() {
        let mut config = MonitorConfig::dashboard();
        config.symbols.truncate(2);
        let client = FakeClient {
            failing: vec!["ETHUSDT"],
            ..FakeClient::new()
        };
        let scheduler = Scheduler::new(Arc::new(client), &config);
        let mut state = DashboardState::new(&config.symbols, scheduler.period());

        state.set_updating();
        assert_eq!(state.status, "Updating data...");
        assert!(state.last_update.is_none());

        state.apply(scheduler.run_cycle().await);
        assert!(state.last_update.is_some());
        assert!(state.status.starts_with("Data updated, 1 symbol(s) unavailable."));
        assert!(state.cards[0].ticker.is_some());
        assert_eq!(state.cards[0].rows.len(), 5);
        assert!(state.cards[1].ticker.is_none());
        // The manual cycle never touches the background phase.
        assert_eq!(*scheduler.phase().borrow(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn background_cycles_reach_the_ui_through_the_channel() {
        let config = MonitorConfig::dashboard();
        let scheduler = Arc::new(Scheduler::new(Arc::new(FakeClient::new()), &config));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (handle, shutdown) = shutdown_channel();

        let worker = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                let mut sink = ChannelSink::new(tx);
                scheduler.run(&mut sink, shutdown).await;
            })
        };

        let mut state = DashboardState::new(&config.symbols, scheduler.period());
        let first = rx.recv().await.unwrap();
        assert_eq!(first.symbols.len(), config.symbols.len());
        state.apply(first);
        assert!(state.cards.iter().all(|c| c.ticker.is_some()));
        assert!(state.cards.iter().all(|c| c.rows.len() == 5));

        // A second report arrives one period later.
        let second = rx.recv().await.unwrap();
        assert!(second.started_at >= state.last_update.unwrap());

        handle.trigger();
        worker.await.unwrap();
        assert_eq!(*scheduler.phase().borrow(), Phase::Stopped);
    }

    #[test]
    fn channel_sink_errors_once_ui_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        let report = CycleReport {
            started_at: chrono::Utc::now(),
            symbols: Vec::new(),
        };
        assert!(sink.render(report).is_err());
    }
}
