//! External scraping service client
//!
//! Speaks the same `{profileUrl}` → `{success, data}` contract as this
//! service's own `/linkedin/scrape` endpoint, so deployments can move the
//! browser-heavy work to a separate host.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{ProfileScraper, ScrapeRequest, ScrapeResponse, ScrapedFragment};
use crate::linkedin::UpstreamError;

const ENDPOINT: &str = "remote_scraper";

pub struct RemoteScraper {
    http: Client,
    url: String,
}

impl RemoteScraper {
    pub fn new(url: impl Into<String>, timeout: Duration) -> lpi_common::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(lpi_common::config::get_user_agent())
            .build()
            .map_err(|e| lpi_common::Error::Config(format!("Failed to build scraper client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ProfileScraper for RemoteScraper {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn scrape(&self, profile_url: &str) -> Result<ScrapedFragment, UpstreamError> {
        tracing::debug!(profile_url, scraper = %self.url, "Delegating profile scrape");

        let response = self
            .http
            .post(&self.url)
            .json(&ScrapeRequest {
                profile_url: profile_url.to_string(),
            })
            .send()
            .await
            .map_err(|e| UpstreamError::network(ENDPOINT, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(ENDPOINT, status.as_u16(), body));
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::parse(ENDPOINT, format!("invalid JSON body: {}", e)))?;

        if !body.success {
            let reason = body.error.unwrap_or_else(|| "scraper reported failure".to_string());
            return Err(UpstreamError::parse(ENDPOINT, reason));
        }

        Ok(body.data.unwrap_or_default().normalized())
    }
}
