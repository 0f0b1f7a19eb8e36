//! LinkedIn upstream plumbing
//!
//! - `client`: shared HTTP client, endpoint URLs, classified `UpstreamError`
//! - `token`: authorization-code → access-token exchange

pub mod client;
pub mod token;

pub use client::{LinkedInClient, LinkedInEndpoints, UpstreamError};
pub use token::ClientCredentials;
