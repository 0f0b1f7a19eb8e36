//! Direct page scraper

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

use super::extract::extract_profile;
use super::{ProfileScraper, ScrapedFragment};
use crate::linkedin::UpstreamError;

const ENDPOINT: &str = "profile_page";

/// Browser-like user agent; LinkedIn serves an empty shell to obvious bots
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Fetches the public profile page and extracts fields locally
pub struct PageScraper {
    http: Client,
}

impl PageScraper {
    pub fn new(timeout: Duration) -> lpi_common::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| lpi_common::Error::Config(format!("Failed to build scraper client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl ProfileScraper for PageScraper {
    fn name(&self) -> &'static str {
        "page"
    }

    async fn scrape(&self, profile_url: &str) -> Result<ScrapedFragment, UpstreamError> {
        tracing::debug!(profile_url, "Fetching public profile page");

        let response = self
            .http
            .get(profile_url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| UpstreamError::network(ENDPOINT, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(ENDPOINT, status.as_u16(), body));
        }

        if response.url().path().contains("authwall") {
            return Err(UpstreamError::parse(ENDPOINT, "redirected to login wall"));
        }

        let html = response
            .text()
            .await
            .map_err(|e| UpstreamError::network(ENDPOINT, &e))?;

        Ok(extract_profile(&html))
    }
}
