//! # LPI Common Library
//!
//! Shared code for the LinkedIn profile import service:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Database initialization (profile and audit tables)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
