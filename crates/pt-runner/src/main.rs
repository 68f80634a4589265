//! # pt-runner
//!
//! Runs the price feed end to end: builds the transport, repository and use
//! cases from a JSON config, attaches a board view (and optionally a detail
//! view for one ticker), and logs what the views see until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! pt-runner config.json --log-level debug --detail AAPL
//! pt-runner --transport websocket --url wss://ws.postman-echo.com/raw --run-for 30
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use pt_core::catalog::Catalog;
use pt_core::config::{AppConfig, TransportKind, UnknownTickerPolicy, load_config};
use pt_core::logging::{LogOptions, init_logging};
use pt_core::transport::{LoopbackTransport, Transport, WsTransport};
use pt_core::types::SymbolState;
use pt_feed::{FeedRepository, PriceFeedUseCase, SnapshotUseCase, spawn_board, spawn_detail};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Rows shown when the board is logged.
const BOARD_TOP: usize = 5;

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    Loopback,
    Websocket,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnknownTickerArg {
    Insert,
    Ignore,
}

/// Price feed runner.
#[derive(Parser)]
#[command(name = "pt-runner", about = "Price feed distribution runner")]
struct Cli {
    /// Configuration file path (JSON). Built-in defaults when omitted.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit console logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Transport override.
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,

    /// WebSocket URL override.
    #[arg(long)]
    url: Option<String>,

    /// Also attach a detail view for this ticker.
    #[arg(long)]
    detail: Option<String>,

    /// Stop after this many seconds instead of waiting for Ctrl+C.
    #[arg(long)]
    run_for: Option<u64>,

    /// What the board does with tickers it has not seen.
    #[arg(long, value_enum)]
    unknown_ticker: Option<UnknownTickerArg>,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut AppConfig) {
        if self.transport.is_some() || self.url.is_some() {
            let section = config.transport.get_or_insert_with(Default::default);
            if let Some(kind) = self.transport {
                section.kind = Some(match kind {
                    TransportArg::Loopback => TransportKind::Loopback,
                    TransportArg::Websocket => TransportKind::Websocket,
                });
            }
            if let Some(url) = &self.url {
                section.url = Some(url.clone());
            }
        }
        if let Some(policy) = self.unknown_ticker {
            config.reconciler.get_or_insert_with(Default::default).unknown_ticker =
                Some(match policy {
                    UnknownTickerArg::Insert => UnknownTickerPolicy::Insert,
                    UnknownTickerArg::Ignore => UnknownTickerPolicy::Ignore,
                });
        }
    }
}

fn build_transport(config: &AppConfig) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match config.transport_kind() {
        TransportKind::Loopback => Arc::new(LoopbackTransport::new(config.loopback_config())),
        TransportKind::Websocket => Arc::new(WsTransport::new(config.ws_config())?),
    };
    Ok(transport)
}

fn format_row(rank: usize, state: &SymbolState) -> String {
    format!(
        "#{:<2} {:<5} {:>8.2} {}",
        rank + 1,
        state.ticker,
        state.current_price,
        state.trend().arrow()
    )
}

fn log_status(mut status: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let open = *status.borrow_and_update();
            if open {
                info!("feed connected");
            } else {
                warn!("feed disconnected");
            }
        }
    })
}

fn log_errors(feed: &PriceFeedUseCase) -> JoinHandle<()> {
    let mut errors = feed.errors();
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(e) => error!("feed error: {e}"),
                Err(RecvError::Lagged(n)) => warn!("error stream lagged, {n} skipped"),
                Err(RecvError::Closed) => return,
            }
        }
    })
}

/// Log the top of the board, at most once per `every`.
fn log_board(mut board: watch::Receiver<Vec<SymbolState>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<Instant> = None;
        while board.changed().await.is_ok() {
            let view = board.borrow_and_update().clone();
            if last.is_some_and(|t| t.elapsed() < every) {
                continue;
            }
            last = Some(Instant::now());
            info!("board ({} symbols):", view.len());
            for (rank, state) in view.iter().take(BOARD_TOP).enumerate() {
                info!("  {}", format_row(rank, state));
            }
        }
    })
}

fn log_detail(mut detail: watch::Receiver<SymbolState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while detail.changed().await.is_ok() {
            let state = detail.borrow_and_update().clone();
            info!(
                "detail {}: {:.2} (prev {}) {}",
                state.ticker,
                state.current_price,
                state
                    .previous_price
                    .map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
                state.trend()
            );
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration and apply overrides
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    // 2. Initialize logging
    init_logging(&LogOptions {
        level: cli.log_level.clone(),
        dir: cli.log_dir.clone().or_else(|| config.log_path()),
        module_name: config.module_name(),
        json: cli.log_json,
    })?;

    info!(
        "pt-runner starting, config={}, log_level={}",
        cli.config
            .as_ref()
            .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string()),
        cli.log_level
    );

    // 3. Wire the core
    let catalog: Arc<Catalog> = Arc::new(config.catalog()?);
    let ticks = config.tick_source()?;
    let settings = config.feed_settings();
    let transport = build_transport(&config)?;
    info!(
        "transport={}, symbols={}, period={:?}, prices={}..{}",
        transport.name(),
        catalog.len(),
        settings.period,
        ticks.min(),
        ticks.max()
    );

    let repository = Arc::new(FeedRepository::new(
        transport,
        catalog.clone(),
        ticks,
        settings.clone(),
    ));
    let feed = Arc::new(PriceFeedUseCase::new(repository.clone()));
    let snapshot = SnapshotUseCase::new(repository).execute();

    // 4. Attach views before starting so no update is missed
    let detail = match &cli.detail {
        Some(ticker) => {
            let Some(initial) = snapshot.iter().find(|s| &s.ticker == ticker).cloned() else {
                bail!("--detail {ticker}: not in the catalog");
            };
            Some(spawn_detail(&feed, initial))
        }
        None => None,
    };
    let board = spawn_board(&feed, snapshot, config.unknown_ticker_policy());

    for (rank, state) in board.current().iter().take(BOARD_TOP).enumerate() {
        info!("snapshot {}", format_row(rank, state));
    }

    let mut loggers = vec![
        log_status(feed.connection_status()),
        log_errors(&feed),
        log_board(board.receiver(), settings.period),
    ];
    if let Some(detail) = &detail {
        loggers.push(log_detail(detail.receiver()));
    }

    feed.start();
    info!("feed started, press Ctrl+C to stop");

    // 5. Wait for shutdown
    match cli.run_for {
        Some(secs) => {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res?;
                    info!("shutdown signal received");
                }
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!("run time of {secs}s elapsed");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("shutdown signal received");
        }
    }

    // 6. Tear down
    feed.stop();
    board.detach();
    if let Some(detail) = detail {
        detail.detach();
    }
    for task in loggers {
        task.abort();
    }

    info!("feed stopped, goodbye");
    Ok(())
}
