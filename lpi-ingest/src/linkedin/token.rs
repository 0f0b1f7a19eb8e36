//! Token Exchange Stage
//!
//! Trades an authorization code for an access token. The code is single-use,
//! so the grant request is posted exactly once and never retried: any
//! failure is terminal for this stage and carries the upstream status and body.

use serde::Deserialize;
use std::fmt;

use super::client::{LinkedInClient, UpstreamError};
use crate::types::AccessToken;

const ENDPOINT: &str = "token_exchange";

/// OAuth application credentials
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl LinkedInClient {
    /// Exchange an authorization code for an access token (single attempt)
    ///
    /// # Errors
    /// `UpstreamError` with the upstream status: 4xx means the code was
    /// rejected, 5xx/no status means LinkedIn was unavailable, 429 means rate
    /// limited. The caller decides whether to restart with a fresh code.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, UpstreamError> {
        let url = self.endpoints().token_url();
        tracing::info!(redirect_uri, "Exchanging authorization code for access token");

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        let response = self
            .http()
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| UpstreamError::network(ENDPOINT, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::network(ENDPOINT, &e))?;

        if !status.is_success() {
            let err = UpstreamError::from_status(ENDPOINT, status.as_u16(), &body);
            tracing::error!(
                status = status.as_u16(),
                class = err.class.as_str(),
                body = %err.body,
                "Token exchange failed"
            );
            return Err(err);
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::parse(ENDPOINT, format!("invalid token response: {}", e)))?;

        match parsed.access_token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                tracing::info!(
                    expires_in = parsed.expires_in,
                    "Access token obtained"
                );
                Ok(AccessToken::new(token))
            }
            None => {
                // A 200 without a token is a rejection of the grant, not an outage
                let detail = parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| "response did not include access_token".to_string());
                tracing::error!(detail = %detail, "Token exchange returned no access token");
                Err(UpstreamError::from_status(ENDPOINT, 400, detail))
            }
        }
    }
}
