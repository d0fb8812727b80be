mod console;
mod dashboard;
mod scheduler;

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use market_monitor_core::config::{
    BINANCE_BASE_URL, DEFAULT_INTERVAL, DEFAULT_REFRESH_SECS, MonitorConfig,
};
use market_monitor_core::symbol::Symbol;
use market_monitor_providers::binance::BinanceClient;
use market_monitor_providers::provider::MarketDataClient;
use tracing::info;

use crate::console::ConsolePrinter;
use crate::scheduler::{Scheduler, shutdown_channel};

#[derive(Parser)]
#[command(
    name = "market-monitor",
    about = "Poll exchange tickers and candles on a timer and display them"
)]
struct Cli {
    /// Symbols to monitor (comma-separated, defaults to five major USDT pairs)
    #[arg(short, long, value_delimiter = ',', global = true)]
    symbols: Option<Vec<Symbol>>,

    /// Candle interval (1m, 5m, 1h, ...)
    #[arg(long, default_value = DEFAULT_INTERVAL, global = true)]
    interval: String,

    /// Seconds to wait between refresh cycles
    #[arg(long, default_value_t = DEFAULT_REFRESH_SECS, global = true)]
    refresh_secs: u64,

    /// Candles fetched per symbol (default: 5 for console, 30 for dashboard)
    #[arg(long, global = true)]
    candle_depth: Option<u32>,

    /// REST API base URL
    #[arg(long, default_value = BINANCE_BASE_URL, global = true)]
    base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file used by the dashboard (console mode logs to stderr)
    #[arg(long, default_value = "market-monitor.log", global = true)]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Print a snapshot to the terminal every refresh period (default)
    Console,

    /// Full-screen dashboard with overview cards and a price chart
    Dashboard,
}

impl Cli {
    fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Console)
    }

    fn monitor_config(&self) -> Result<MonitorConfig> {
        let mut config = match self.command() {
            Commands::Console => MonitorConfig::console(),
            Commands::Dashboard => MonitorConfig::dashboard(),
        };
        if let Some(symbols) = &self.symbols {
            config.symbols = symbols.clone();
        }
        if let Some(depth) = self.candle_depth {
            config.candle_depth = depth;
        }
        config.interval = self.interval.clone();
        config.refresh_period = Duration::from_secs(self.refresh_secs);
        config.base_url = self.base_url.clone();

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    match cli.command() {
        Commands::Console => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        Commands::Dashboard => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&cli.log_file)
                .with_context(|| format!("failed to open log file {}", cli.log_file.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}

/// Blocking model: render to stdout every period until Ctrl+C.
async fn cmd_console<C: MarketDataClient>(scheduler: Scheduler<C>) -> Result<()> {
    let stdout = std::io::stdout();
    let piped = !stdout.is_terminal();
    let mut printer = ConsolePrinter::new(stdout, scheduler.period());
    if piped {
        printer = printer.without_clear();
    }
    // Only Ctrl+C stops console mode; the handle just has to outlive the loop.
    let (_handle, shutdown) = shutdown_channel();

    tokio::select! {
        _ = scheduler.run(&mut printer, shutdown) => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for Ctrl+C")?;
            println!("\nStopped by user.");
            info!("interrupted, exiting");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let config = cli.monitor_config()?;
    let client = BinanceClient::with_base_url(config.base_url.clone(), config.interval.clone())
        .context("failed to create Binance client")?;
    info!(
        client = client.name(),
        symbols = ?config.symbols.iter().map(Symbol::as_str).collect::<Vec<_>>(),
        interval = %config.interval,
        depth = config.candle_depth,
        "monitor configured"
    );

    let scheduler = Scheduler::new(Arc::new(client), &config);
    match cli.command() {
        Commands::Console => cmd_console(scheduler).await,
        Commands::Dashboard => dashboard::run(Arc::new(scheduler), &config.symbols).await,
    }
}
