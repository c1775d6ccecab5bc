//! chainview CLI: watch a node's blocks, transactions and health from the terminal.
//!
//! Usage:
//! ```bash
//! # Live home page: health, latest blocks, latest transactions
//! chainview watch --url http://localhost:8000
//!
//! # A single live table for 30 seconds
//! chainview blocks --size 20 --for 30
//!
//! # Detail pages
//! chainview block 42
//! chainview open /transactions/7
//! ```

mod logging;
mod render;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use chainview_core::lookup::{fetch_block, fetch_transaction};
use chainview_core::session::lock;
use chainview_core::views::{blocks, transactions};
use chainview_core::views::{BlockNormalizer, BlockRow, TransactionNormalizer, TransactionRow};
use chainview_core::{
    shared, DetailState, Endpoints, ExplorerConfig, HealthIndicator, LiveTable, NdjsonSource,
    Route, SessionState, StreamSession, ViewSlot,
};
use chainview_http::{HttpClientConfig, HttpJsonFetcher, HttpStreamSource};

use crate::render::TerminalTable;

#[derive(Parser, Debug)]
#[command(
    name = "chainview",
    about = "Live block explorer for the terminal",
    version
)]
struct Cli {
    /// Backend base URL  [default: http://localhost:8000]
    #[arg(long, global = true)]
    url: Option<String>,

    /// API path prefix  [default: /api/v1]
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Rows per live table  [default: 10]
    #[arg(long, global = true)]
    size: Option<usize>,

    /// JSON config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stop live views after SECS seconds
    #[arg(long = "for", value_name = "SECS", global = true, value_parser = parse_seconds)]
    run_for: Option<Duration>,

    /// trace | debug | info | warn | error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Structured JSON logs on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print rows and details as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Health, live blocks and live transactions together
    Watch,
    /// Open a page path such as /blocks/12
    Open {
        path: String,
    },
    /// Live blocks table
    Blocks,
    /// Live transactions table
    #[command(alias = "txs")]
    Transactions,
    /// Node health indicator
    Health,
    /// Block detail
    Block {
        id: String,
    },
    /// Transaction detail
    #[command(alias = "transaction")]
    Tx {
        id: String,
    },
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("{s} is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("{s} must be a non-negative duration"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let explorer = Explorer::new(cli.settings()?)?;

    match cli.command {
        Commands::Watch => navigate(&explorer, Route::Home).await,
        Commands::Open { path } => match Route::resolve(&path) {
            Route::NotFound => bail!("page not found: {path}"),
            route => navigate(&explorer, route).await,
        },
        Commands::Blocks => cmd_blocks(&explorer).await,
        Commands::Transactions => cmd_transactions(&explorer).await,
        Commands::Health => cmd_health(&explorer).await,
        Commands::Block { id } => navigate(&explorer, Route::BlockDetail(id)).await,
        Commands::Tx { id } => navigate(&explorer, Route::TransactionDetail(id)).await,
    }
}

/// Command-line settings after merging the config file and flags.
struct Settings {
    config: ExplorerConfig,
    run_for: Option<Duration>,
    json: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut config = match &self.config {
            Some(path) => ExplorerConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ExplorerConfig::default(),
        };
        if let Some(url) = &self.url {
            config.base_url = url.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.api_prefix = prefix.clone();
        }
        if let Some(size) = self.size {
            config.table_size = size;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
        if self.json_logs {
            config.log.json = true;
        }

        config.validate()?;
        Ok(Settings {
            config,
            run_for: self.run_for,
            json: self.json,
        })
    }
}

/// Everything a command needs to talk to the backend.
struct Explorer {
    settings: Settings,
    endpoints: Endpoints,
    capacity: NonZeroUsize,
    source: Arc<dyn NdjsonSource>,
    fetcher: HttpJsonFetcher,
}

impl Explorer {
    fn new(settings: Settings) -> Result<Self> {
        logging::init_tracing(&settings.config.log)?;

        let http = HttpClientConfig::from(&settings.config);
        let endpoints = settings.config.endpoints()?;
        let capacity = settings.config.capacity()?;
        let source = Arc::new(HttpStreamSource::new(&http).context("building HTTP client")?);
        let fetcher = HttpJsonFetcher::new(&http).context("building HTTP client")?;

        tracing::debug!(
            base_url = %settings.config.base_url,
            table_size = capacity.get(),
            "explorer configured"
        );
        Ok(Self {
            settings,
            endpoints,
            capacity,
            source,
            fetcher,
        })
    }

    fn prefetch_limit(&self) -> usize {
        self.settings.config.prefetch_limit()
    }

    fn blocks_table(&self) -> LiveTable<BlockNormalizer, TerminalTable<BlockRow>> {
        blocks::live_table(self.capacity, TerminalTable::new(self.settings.json))
    }

    fn transactions_table(&self) -> LiveTable<TransactionNormalizer, TerminalTable<TransactionRow>> {
        transactions::live_table(self.capacity, TerminalTable::new(self.settings.json))
    }
}

/// Resolves on Ctrl-C or once `run_for` has elapsed.
async fn stop_signal(run_for: Option<Duration>) {
    let elapsed = async {
        match run_for {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        _ = elapsed => tracing::info!("run time elapsed"),
    }
}

/// Run one session until it ends on its own or the user stops it.
async fn supervise(mut session: StreamSession, run_for: Option<Duration>) -> SessionState {
    tokio::select! {
        _ = session.join() => {}
        _ = stop_signal(run_for) => {
            session.cancel();
            session.join().await;
        }
    }
    session.state()
}

fn finish(state: SessionState, last_error: Option<String>) -> Result<()> {
    match state {
        SessionState::Failed => Err(anyhow!(
            "stream failed: {}",
            last_error.unwrap_or_else(|| "unknown error".into())
        )),
        SessionState::Closed => {
            eprintln!("Stream closed by server.");
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn cmd_blocks(explorer: &Explorer) -> Result<()> {
    let table = shared(explorer.blocks_table());
    let url = explorer.endpoints.blocks_stream(explorer.prefetch_limit());
    let session = StreamSession::start(explorer.source.clone(), url, table.clone());

    let state = supervise(session, explorer.settings.run_for).await;
    let last_error = lock(&table).last_error().map(str::to_string);
    finish(state, last_error)
}

async fn cmd_transactions(explorer: &Explorer) -> Result<()> {
    let table = shared(explorer.transactions_table());
    let url = explorer
        .endpoints
        .transactions_stream(explorer.prefetch_limit());
    let session = StreamSession::start(explorer.source.clone(), url, table.clone());

    let state = supervise(session, explorer.settings.run_for).await;
    let last_error = lock(&table).last_error().map(str::to_string);
    finish(state, last_error)
}

async fn cmd_health(explorer: &Explorer) -> Result<()> {
    render::print_health(Default::default());
    let health = shared(HealthIndicator::new().with_observer(render::print_health));
    let session = StreamSession::start(
        explorer.source.clone(),
        explorer.endpoints.health_stream(),
        health.clone(),
    );

    let state = supervise(session, explorer.settings.run_for).await;
    finish(state, Some("node unreachable".into()))
}

/// Show a page and run it until it is done.
async fn navigate(explorer: &Explorer, route: Route) -> Result<()> {
    tracing::debug!(path = %route.path(), "navigating");
    match route {
        Route::Home => run_home(explorer).await,
        Route::BlockDetail(raw) => {
            let state =
                DetailState::from_result(fetch_block(&explorer.fetcher, &explorer.endpoints, &raw).await);
            show_detail(state, "block", explorer.settings.json, render::print_block)
        }
        Route::TransactionDetail(raw) => {
            let state = DetailState::from_result(
                fetch_transaction(&explorer.fetcher, &explorer.endpoints, &raw).await,
            );
            show_detail(state, "transaction", explorer.settings.json, render::print_transaction)
        }
        Route::NotFound => bail!("page not found"),
    }
}

fn show_detail<T: serde::Serialize>(
    state: DetailState<T>,
    entity: &str,
    json: bool,
    print: fn(&T),
) -> Result<()> {
    match state {
        DetailState::Loaded(detail) if json => {
            println!("{}", serde_json::to_string_pretty(&detail)?);
            Ok(())
        }
        DetailState::Loaded(detail) => {
            print(&detail);
            Ok(())
        }
        other => bail!(other.message(entity).unwrap_or_default()),
    }
}

/// The home page: one slot per live view, all torn down when leaving.
async fn run_home(explorer: &Explorer) -> Result<()> {
    let mut health_slot = ViewSlot::new("health");
    let mut blocks_slot = ViewSlot::new("blocks");
    let mut transactions_slot = ViewSlot::new("transactions");

    let health = shared(HealthIndicator::new().with_observer(render::print_health));
    let blocks = shared(explorer.blocks_table());
    let transactions = shared(explorer.transactions_table());
    let prefetch = explorer.prefetch_limit();

    health_slot
        .start(explorer.source.clone(), explorer.endpoints.health_stream(), health)
        .await;
    blocks_slot
        .start(
            explorer.source.clone(),
            explorer.endpoints.blocks_stream(prefetch),
            blocks.clone(),
        )
        .await;
    transactions_slot
        .start(
            explorer.source.clone(),
            explorer.endpoints.transactions_stream(prefetch),
            transactions.clone(),
        )
        .await;

    stop_signal(explorer.settings.run_for).await;

    health_slot.stop().await;
    blocks_slot.stop().await;
    transactions_slot.stop().await;

    for (view, error) in [
        ("blocks", lock(&blocks).last_error().map(str::to_string)),
        ("transactions", lock(&transactions).last_error().map(str::to_string)),
    ] {
        if let Some(error) = error {
            eprintln!("{view}: {error}");
        }
    }
    Ok(())
}
