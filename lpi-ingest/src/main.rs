//! lpi-ingest - LinkedIn Profile Import service
//!
//! Exchanges OAuth authorization codes for LinkedIn profile data, merges the
//! sources into one profile and stores it with an audit trail.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lpi_common::config::{load_config_or_default, resolve_root_folder, DATABASE_FILE_NAME};
use lpi_ingest::config::IngestConfig;
use lpi_ingest::AppState;

/// Command-line arguments for lpi-ingest
#[derive(Parser, Debug)]
#[command(name = "lpi-ingest")]
#[command(about = "LinkedIn profile import service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5790", env = "LPI_PORT")]
    port: u16,

    /// Root folder holding the database (falls back to LPI_ROOT_FOLDER, then TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "LPI_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lpi_ingest=info,lpi_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_profile = env!("BUILD_PROFILE"),
        "Starting lpi-ingest on port {}",
        args.port
    );

    let toml_config = load_config_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let (root_folder, root_source) =
        resolve_root_folder(args.root_folder.as_deref(), "LPI_ROOT_FOLDER", &toml_config);
    info!("Root folder: {} (from {})", root_folder.display(), root_source);

    let ingest_config = IngestConfig::resolve(&toml_config).context("Invalid configuration")?;

    let db_path = root_folder.join(DATABASE_FILE_NAME);
    let db = lpi_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database: {}", db_path.display());

    let state = AppState::from_config(db, &ingest_config).context("Failed to build import pipeline")?;
    let app = lpi_ingest::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
