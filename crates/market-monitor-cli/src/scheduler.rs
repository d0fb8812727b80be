//! Fetch -> render -> wait loop shared by the console printer and the dashboard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use market_monitor_core::config::MonitorConfig;
use market_monitor_core::report::{CycleReport, SymbolReport, Unavailable};
use market_monitor_core::symbol::Symbol;
use market_monitor_providers::provider::MarketDataClient;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Rendering,
    Waiting,
    Stopped,
}

/// Receives each completed cycle, synchronously.
pub trait PresentationSink {
    fn render(&mut self, report: CycleReport) -> anyhow::Result<()>;
}

/// Receiving side of the shutdown token. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Triggering side of the shutdown token.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered, or once the handle is dropped.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

pub struct Scheduler<C> {
    client: Arc<C>,
    symbols: Vec<Symbol>,
    candle_depth: u32,
    period: Duration,
    phase: watch::Sender<Phase>,
}

impl<C: MarketDataClient> Scheduler<C> {
    pub fn new(client: Arc<C>, config: &MonitorConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            client,
            symbols: config.symbols.clone(),
            candle_depth: config.candle_depth,
            period: config.refresh_period,
            phase,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Observe phase transitions.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        debug!(?phase, "scheduler phase");
        self.phase.send_replace(phase);
    }

    /// Fetch ticker then candles for every symbol, in order.
    ///
    /// Failures are logged and recorded per slot; they never abort the cycle.
    /// Safe to call while `run` is active (manual refresh); it does not touch
    /// the phase or the wait timer.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let mut symbols = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            let ticker = self.client.fetch_ticker(symbol).await.map_err(|e| {
                warn!(%symbol, client = self.client.name(), "ticker fetch failed: {e}");
                Unavailable::from(&e)
            });

            let candles = self
                .client
                .fetch_candles(symbol, self.candle_depth)
                .await
                .map_err(|e| {
                    warn!(%symbol, client = self.client.name(), "candle fetch failed: {e}");
                    Unavailable::from(&e)
                });

            symbols.push(SymbolReport {
                symbol: symbol.clone(),
                ticker,
                candles,
            });
        }

        let report = CycleReport {
            started_at,
            symbols,
        };
        info!(
            symbols = report.symbols.len(),
            failures = report.failures(),
            "refresh cycle complete"
        );
        report
    }

    /// Run cycles until `shutdown` fires: fetch, render, then wait one full
    /// period measured from the start of the wait.
    ///
    /// A cycle already fetching when shutdown fires finishes its requests
    /// but is not rendered.
    pub async fn run<S: PresentationSink>(&self, sink: &mut S, mut shutdown: Shutdown) {
        info!(
            symbols = self.symbols.len(),
            period_secs = self.period.as_secs(),
            "scheduler started"
        );

        while !shutdown.is_triggered() {
            self.enter(Phase::Fetching);
            let report = self.run_cycle().await;
            if shutdown.is_triggered() {
                break;
            }

            self.enter(Phase::Rendering);
            if let Err(e) = sink.render(report) {
                warn!("render failed: {e:#}");
            }

            self.enter(Phase::Waiting);
            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = shutdown.triggered() => break,
            }
        }

        self.enter(Phase::Stopped);
        info!("scheduler stopped");
    }
}
