//! lpi-ingest library interface
//!
//! Exposes the pipeline and HTTP surface for the binary and for integration
//! testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod linkedin;
pub mod scraper;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::IngestConfig;
use crate::db::SqliteProfileSink;
use crate::linkedin::LinkedInClient;
use crate::scraper::{PageScraper, ProfileScraper, RemoteScraper};
use crate::workflow::{ImportPipeline, ProfileSourceChain};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub pipeline: Arc<ImportPipeline>,
    /// Backend behind both the scrape strategy and `/linkedin/scrape`
    pub scraper: Arc<dyn ProfileScraper>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<ImportPipeline>, scraper: Arc<dyn ProfileScraper>) -> Self {
        Self {
            db,
            pipeline,
            scraper,
            startup_time: Utc::now(),
        }
    }

    /// Wire the full import pipeline from resolved configuration
    pub fn from_config(db: SqlitePool, config: &IngestConfig) -> lpi_common::Result<Self> {
        let client = Arc::new(LinkedInClient::new(
            config.endpoints.clone(),
            config.request_timeout,
            config.retry.clone(),
        )?);

        let scraper: Arc<dyn ProfileScraper> = match &config.scraper_url {
            Some(url) => {
                tracing::info!(scraper_url = %url, "Using remote profile scraper");
                Arc::new(RemoteScraper::new(url.clone(), config.request_timeout)?)
            }
            None => Arc::new(PageScraper::new(config.request_timeout)?),
        };

        let chain = ProfileSourceChain::new(extractors::default_strategies(
            Arc::clone(&client),
            Arc::clone(&scraper),
        ));

        let pipeline = ImportPipeline::new(
            client,
            config.credentials.clone(),
            config.default_redirect_uri.clone(),
            chain,
            Arc::new(SqliteProfileSink::new(db.clone())),
        );

        Ok(Self::new(db, Arc::new(pipeline), scraper))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::scrape_routes())
        .merge(api::profile_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
