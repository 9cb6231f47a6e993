use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bullion_board::clock::run_clock;
use bullion_board::config::Settings;
use bullion_board::display::{DisplayBoard, DisplaySurface};
use bullion_board::pricing::client::build_client;
use bullion_board::pricing::{HttpAdjustmentSource, HttpMarketSource};
use bullion_board::refresh::{PriceRenderer, RefreshTimer, TracingObserver};
use bullion_board::server::{self, AppState};
use bullion_board::store::SledStore;
use bullion_board::telemetry;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "bullion-board", version, about = "Live gold and silver price board")]
struct Cli {
    /// Settings file (TOML). Defaults to ./bullion.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the passthrough API and the display page, with the board refreshing in-process.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Serve the API only; do not run the refresh timer or clock.
        #[arg(long)]
        no_board: bool,
    },
    /// Run only the refresh timer and clock against the configured endpoints.
    Board,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    telemetry::init_tracing(&settings.log_filter)?;
    telemetry::init_metrics(settings.metrics.listen)?;

    match cli.command {
        Command::Serve { host, port, no_board } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(settings, !no_board).await
        }
        Command::Board => {
            let board = DisplayBoard::new();
            let local = SocketAddr::from((Ipv4Addr::LOCALHOST, settings.server.port));
            start_board(&settings, settings.adjustments_url(local), Arc::new(board))?;
            tokio::signal::ctrl_c().await?;
            info!("shutdown requested");
            Ok(())
        }
    }
}

async fn serve(settings: Settings, with_board: bool) -> anyhow::Result<()> {
    let store = SledStore::open(&settings.store.path)
        .with_context(|| format!("opening store at {}", settings.store.path.display()))?;
    let board = DisplayBoard::new();
    let state = AppState {
        store: Arc::new(store),
        default_collection: settings.store.default_collection.clone(),
        board: board.clone(),
    };

    let listener = TcpListener::bind((settings.server.host.as_str(), settings.server.port))
        .await
        .with_context(|| format!("binding {}:{}", settings.server.host, settings.server.port))?;

    if with_board {
        let local = listener.local_addr()?;
        start_board(&settings, settings.adjustments_url(local), Arc::new(board))?;
    }

    let app = server::router(state, settings.server.static_dir.as_deref());
    server::serve(listener, app).await?;
    Ok(())
}

/// Spawn the refresh timer and the clock; both run until the process exits.
fn start_board(
    settings: &Settings,
    adjustments_url: String,
    surface: Arc<dyn DisplaySurface>,
) -> anyhow::Result<()> {
    let board = &settings.board;
    let client = build_client(Duration::from_secs(board.request_timeout_secs))?;
    info!(
        adjustments = %adjustments_url,
        market = %board.market_url,
        every_secs = board.refresh_secs,
        "starting price board"
    );

    let renderer = PriceRenderer::new(
        HttpAdjustmentSource::new(client.clone(), adjustments_url),
        HttpMarketSource::new(client, board.market_url.clone()),
        board.currency.clone(),
    );
    let timer = RefreshTimer::new(renderer, Arc::clone(&surface), Arc::new(TracingObserver), board.refresh_secs);

    tokio::spawn(timer.run());
    tokio::spawn(run_clock(surface, board.clock_style));
    Ok(())
}
