//! Configuration resolution for lpi-ingest
//!
//! Credentials resolve ENV → TOML; everything else comes from TOML with
//! compiled defaults. Missing client credentials stop startup.

use std::time::Duration;
use tracing::info;

use lpi_common::config::{resolve_setting, TomlConfig};
use lpi_common::{Error, Result};

use crate::linkedin::client::{
    DEFAULT_API_BASE_URL, DEFAULT_OAUTH_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_WWW_BASE_URL,
};
use crate::linkedin::{ClientCredentials, LinkedInEndpoints};
use crate::utils::RetryPolicy;

pub const ENV_CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "LINKEDIN_REDIRECT_URI";
pub const ENV_SCRAPER_URL: &str = "LPI_SCRAPER_URL";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: [u64; 2] = [2000, 4000];

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub credentials: ClientCredentials,
    /// Used when an import request carries no redirect URI
    pub default_redirect_uri: Option<String>,
    pub endpoints: LinkedInEndpoints,
    /// External scraping service; the in-process page scraper when unset
    pub scraper_url: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl IngestConfig {
    /// Resolve from environment and TOML
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let section = &toml.linkedin;

        let (client_id, id_source) =
            resolve_setting("client_id", ENV_CLIENT_ID, section.client_id.as_deref()).ok_or_else(|| {
                Error::Config(format!(
                    "LinkedIn client id not configured (set {} or [linkedin] client_id)",
                    ENV_CLIENT_ID
                ))
            })?;
        let (client_secret, secret_source) = resolve_setting(
            "client_secret",
            ENV_CLIENT_SECRET,
            section.client_secret.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "LinkedIn client secret not configured (set {} or [linkedin] client_secret)",
                ENV_CLIENT_SECRET
            ))
        })?;

        info!(client_id = %client_id, source = %id_source, "LinkedIn client id resolved");
        info!(source = %secret_source, "LinkedIn client secret resolved");

        let default_redirect_uri =
            resolve_setting("redirect_uri", ENV_REDIRECT_URI, section.redirect_uri.as_deref())
                .map(|(uri, source)| {
                    info!(redirect_uri = %uri, source = %source, "Default redirect URI resolved");
                    uri
                });

        let scraper_url =
            resolve_setting("scraper_url", ENV_SCRAPER_URL, section.scraper_url.as_deref())
                .map(|(url, _)| url);

        let endpoints = LinkedInEndpoints {
            oauth_base: non_empty_or(section.oauth_base_url.as_deref(), DEFAULT_OAUTH_BASE_URL),
            api_base: non_empty_or(section.api_base_url.as_deref(), DEFAULT_API_BASE_URL),
            www_base: non_empty_or(section.www_base_url.as_deref(), DEFAULT_WWW_BASE_URL),
        };

        let request_timeout = match section.request_timeout_secs {
            Some(0) => return Err(Error::Config("request_timeout_secs must be positive".to_string())),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let retry = match (toml.retry.max_attempts, toml.retry.backoff_ms.as_deref()) {
            (None, None) => RetryPolicy::default(),
            (attempts, backoff) => RetryPolicy::from_millis(
                attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                backoff.unwrap_or(&DEFAULT_BACKOFF_MS[..]),
            )?,
        };

        Ok(Self {
            credentials: ClientCredentials {
                client_id,
                client_secret,
            },
            default_redirect_uri,
            endpoints,
            scraper_url,
            request_timeout,
            retry,
        })
    }
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with_credentials() -> TomlConfig {
        toml::from_str(
            r#"
            [linkedin]
            client_id = "toml-id"
            client_secret = "toml-secret"
            api_base_url = "http://127.0.0.1:9000/"
            request_timeout_secs = 3

            [retry]
            max_attempts = 4
            backoff_ms = [10, 20]
            "#,
        )
        .unwrap()
    }

    fn clear_env() {
        for var in [ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_REDIRECT_URI, ENV_SCRAPER_URL] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_resolve_from_toml() {
        clear_env();

        let config = IngestConfig::resolve(&toml_with_credentials()).unwrap();

        assert_eq!(config.credentials.client_id, "toml-id");
        assert_eq!(config.endpoints.api_base, "http://127.0.0.1:9000/");
        assert_eq!(config.endpoints.oauth_base, DEFAULT_OAUTH_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.retry.max_attempts(), 4);
        assert_eq!(config.retry.delay_after(0), Duration::from_millis(10));
        assert_eq!(config.retry.delay_after(2), Duration::from_millis(20));
        assert!(config.default_redirect_uri.is_none());
        assert!(config.scraper_url.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_toml() {
        clear_env();
        std::env::set_var(ENV_CLIENT_ID, "env-id");
        std::env::set_var(ENV_REDIRECT_URI, "https://app.example.com/callback");

        let config = IngestConfig::resolve(&toml_with_credentials()).unwrap();
        clear_env();

        assert_eq!(config.credentials.client_id, "env-id");
        assert_eq!(config.credentials.client_secret, "toml-secret");
        assert_eq!(
            config.default_redirect_uri.as_deref(),
            Some("https://app.example.com/callback")
        );
    }

    #[test]
    #[serial]
    fn test_missing_credentials_is_config_error() {
        clear_env();

        let result = IngestConfig::resolve(&TomlConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_defaults_without_retry_section() {
        clear_env();
        let mut toml = toml_with_credentials();
        toml.retry = Default::default();
        toml.linkedin.request_timeout_secs = None;

        let config = IngestConfig::resolve(&toml).unwrap();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    #[serial]
    fn test_decreasing_backoff_rejected() {
        clear_env();
        let mut toml = toml_with_credentials();
        toml.retry.backoff_ms = Some(vec![400, 100]);
        assert!(matches!(IngestConfig::resolve(&toml), Err(Error::Config(_))));
    }
}
