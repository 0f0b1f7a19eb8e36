//! Public profile scraping
//!
//! The only source that reliably yields a headline for apps without the
//! legacy profile scope. Two backends share the [`ProfileScraper`] trait:
//! - [`PageScraper`] fetches the page directly and runs [`extract::extract_profile`]
//! - [`RemoteScraper`] delegates to an external scraping service over the
//!   `/linkedin/scrape` contract this service also exposes
//!
//! Scraping is never retried: a blocked or broken page will not improve
//! within the lifetime of one import.

pub mod extract;
pub mod page;
pub mod remote;

pub use page::PageScraper;
pub use remote::RemoteScraper;

use serde::{Deserialize, Serialize};

use crate::linkedin::UpstreamError;
use crate::types::{CandidateObservation, FieldName, ImageVariant, SourceId};

/// Which extraction path produced a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    JsonLd,
    MetaDescription,
    Title,
    EmbeddedState,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::JsonLd => "json_ld",
            ExtractionMethod::MetaDescription => "meta_description",
            ExtractionMethod::Title => "title",
            ExtractionMethod::EmbeddedState => "embedded_state",
        }
    }
}

/// Fields recovered from one public profile page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapedFragment {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub image_url: Option<String>,
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
}

impl ScrapedFragment {
    /// No field was recovered
    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.headline,
            &self.image_url,
            &self.profile_url,
        ]
        .iter()
        .all(|v| v.is_none())
    }

    /// Trim every field and drop the blank ones
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|v| !v.is_empty())
        }

        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            headline: clean(self.headline),
            image_url: clean(self.image_url),
            profile_url: clean(self.profile_url),
            extraction_method: self.extraction_method,
        }
    }

    /// Scrape-sourced observations for every recovered field
    pub fn into_observations(self) -> Vec<CandidateObservation> {
        let source = SourceId::Scrape;
        let mut out = Vec::new();

        out.extend(self.headline.and_then(|v| CandidateObservation::text(source, FieldName::Headline, v)));
        out.extend(self.first_name.and_then(|v| CandidateObservation::text(source, FieldName::GivenName, v)));
        out.extend(self.last_name.and_then(|v| CandidateObservation::text(source, FieldName::FamilyName, v)));
        out.extend(
            self.image_url
                .and_then(|url| CandidateObservation::images(source, vec![ImageVariant::new(url, None, None)])),
        );
        out.extend(self.profile_url.and_then(|v| CandidateObservation::text(source, FieldName::ProfileUrl, v)));

        out
    }
}

/// Request body of the scrape RPC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub profile_url: String,
}

/// Response body of the scrape RPC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ScrapedFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Backend that turns a public profile URL into a fragment
#[async_trait::async_trait]
pub trait ProfileScraper: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Single attempt at scraping `profile_url`
    ///
    /// An empty fragment is a successful scrape of a page with nothing
    /// extractable, not an error.
    async fn scrape(&self, profile_url: &str) -> Result<ScrapedFragment, UpstreamError>;
}

/// Profile URL must be absolute http(s)
pub fn is_valid_profile_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host_and_path) if !host_and_path.is_empty() && !host_and_path.starts_with('/'))
}

/// Lowercased `host[:port]` of an absolute http(s) URL, without a leading `www.`
///
/// `None` for relative URLs and for authorities carrying userinfo.
fn profile_host(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() || authority.contains('@') {
        return None;
    }

    let authority = authority.to_ascii_lowercase();
    Some(authority.strip_prefix("www.").map(str::to_string).unwrap_or(authority))
}

/// Profile URL must be absolute http(s) and point at `www_base`'s host or
/// one of its subdomains (e.g. `uk.linkedin.com`)
pub fn is_allowed_profile_url(url: &str, www_base: &str) -> bool {
    if !is_valid_profile_url(url) {
        return false;
    }

    match (profile_host(url), profile_host(www_base)) {
        (Some(host), Some(allowed)) => host == allowed || host.ends_with(&format!(".{}", allowed)),
        _ => false,
    }
}
