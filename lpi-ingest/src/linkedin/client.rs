//! LinkedIn HTTP client
//!
//! Shared `reqwest` client for every LinkedIn call, plus `UpstreamError`,
//! the classified failure of one upstream request.
//!
//! # Classification
//! - 429 → `RateLimited`
//! - 5xx, 408, connect/timeout errors → `Transient`
//! - other 4xx, unparseable bodies → `Permanent`

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

use crate::types::AccessToken;
use crate::utils::{invoke_with_retry, Classify, FailureClass, RetryPolicy};

/// Default LinkedIn OAuth host (token endpoint, OAuth-scoped UserInfo)
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://www.linkedin.com";

/// Default LinkedIn REST API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.linkedin.com";

/// Default LinkedIn public web host (profile pages)
pub const DEFAULT_WWW_BASE_URL: &str = "https://www.linkedin.com";

/// Default timeout for LinkedIn requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest upstream body kept in errors and logs
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Base URLs for the three LinkedIn hosts
///
/// Overridable so tests and staging can point at a fake upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedInEndpoints {
    pub oauth_base: String,
    pub api_base: String,
    pub www_base: String,
}

impl Default for LinkedInEndpoints {
    fn default() -> Self {
        Self {
            oauth_base: DEFAULT_OAUTH_BASE_URL.to_string(),
            api_base: DEFAULT_API_BASE_URL.to_string(),
            www_base: DEFAULT_WWW_BASE_URL.to_string(),
        }
    }
}

impl LinkedInEndpoints {
    /// Same base URL for all three hosts
    pub fn single_host(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            oauth_base: base.clone(),
            api_base: base.clone(),
            www_base: base,
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/accessToken", trim_base(&self.oauth_base))
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/v2/userinfo", trim_base(&self.api_base))
    }

    /// Provider-specific UserInfo equivalent, tried on 404
    pub fn userinfo_fallback_url(&self) -> String {
        format!("{}/oauth/v2/userinfo", trim_base(&self.oauth_base))
    }

    pub fn me_url(&self, projection: Option<&str>) -> String {
        match projection {
            Some(p) => format!("{}/v2/me?projection={}", trim_base(&self.api_base), p),
            None => format!("{}/v2/me", trim_base(&self.api_base)),
        }
    }

    pub fn email_url(&self) -> String {
        format!(
            "{}/v2/emailAddress?q=members&projection=(elements*(handle~))",
            trim_base(&self.api_base)
        )
    }

    /// Public profile URL for a vanity name
    pub fn public_profile_url(&self, vanity_name: &str) -> String {
        format!("{}/in/{}", trim_base(&self.www_base), vanity_name)
    }
}

fn trim_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// Classified failure of one upstream request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub class: FailureClass,
    /// HTTP status, `None` when no response was received
    pub status: Option<u16>,
    /// Logical endpoint name (e.g. "userinfo", "me(full)")
    pub endpoint: String,
    /// Upstream body or transport error text, truncated
    pub body: String,
}

impl UpstreamError {
    /// Failure from a non-success HTTP status
    pub fn from_status(endpoint: impl Into<String>, status: u16, body: impl AsRef<str>) -> Self {
        let class = match status {
            429 => FailureClass::RateLimited,
            408 => FailureClass::Transient,
            s if s >= 500 => FailureClass::Transient,
            _ => FailureClass::Permanent,
        };

        Self {
            class,
            status: Some(status),
            endpoint: endpoint.into(),
            body: truncate(body.as_ref()),
        }
    }

    /// Failure before any response arrived
    pub fn network(endpoint: impl Into<String>, err: &reqwest::Error) -> Self {
        Self {
            class: FailureClass::Transient,
            status: None,
            endpoint: endpoint.into(),
            body: truncate(&err.to_string()),
        }
    }

    /// Success status with a body that could not be used
    pub fn parse(endpoint: impl Into<String>, message: impl AsRef<str>) -> Self {
        Self {
            class: FailureClass::Permanent,
            status: None,
            endpoint: endpoint.into(),
            body: truncate(message.as_ref()),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == Some(403)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} returned {}: {}", self.endpoint, status, self.body),
            None => write!(f, "{} failed: {}", self.endpoint, self.body),
        }
    }
}

impl std::error::Error for UpstreamError {}

impl Classify for UpstreamError {
    fn failure_class(&self) -> FailureClass {
        self.class
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push('…');
        cut
    }
}

/// LinkedIn API client
///
/// Owns the HTTP client (timeouts, default headers), the endpoint set and the
/// retry policy applied to idempotent GETs.
#[derive(Debug, Clone)]
pub struct LinkedInClient {
    http: Client,
    endpoints: LinkedInEndpoints,
    retry: RetryPolicy,
}

impl LinkedInClient {
    /// Create new LinkedIn client
    pub fn new(
        endpoints: LinkedInEndpoints,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> lpi_common::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(lpi_common::config::get_user_agent())
            .build()
            .map_err(|e| lpi_common::Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints,
            retry,
        })
    }

    pub fn endpoints(&self) -> &LinkedInEndpoints {
        &self.endpoints
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Authorized GET decoded as JSON, retried per the client's policy
    ///
    /// `endpoint` names the call in logs and errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        token: &AccessToken,
    ) -> Result<T, UpstreamError> {
        invoke_with_retry(endpoint, &self.retry, |_| self.get_json_once(endpoint, url, token)).await
    }

    /// Single authorized GET decoded as JSON
    pub async fn get_json_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        token: &AccessToken,
    ) -> Result<T, UpstreamError> {
        tracing::debug!(endpoint, url, "LinkedIn GET");

        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| UpstreamError::network(endpoint, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(endpoint, status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::parse(endpoint, format!("invalid JSON body: {}", e)))
    }
}
