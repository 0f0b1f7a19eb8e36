//! HTTP API handlers for lpi-ingest

pub mod health;
pub mod import;
pub mod profiles;
pub mod scrape;

pub use health::health_routes;
pub use import::import_routes;
pub use profiles::profile_routes;
pub use scrape::scrape_routes;
