//! Scrape strategy
//!
//! Last in the chain. Runs only when the headline is still missing and a
//! profile URL is known, preferring an observed URL over the constructed
//! guess. A page fetched from a guessed URL may belong to someone else, so
//! only its headline is kept.

use std::sync::Arc;

use crate::scraper::ProfileScraper;
use crate::types::{
    AccessToken, CandidateObservation, FieldName, ObservationSet, ProfileStrategy, SourceId,
    StrategyError,
};

pub struct ScrapeStrategy {
    scraper: Arc<dyn ProfileScraper>,
}

impl ScrapeStrategy {
    pub fn new(scraper: Arc<dyn ProfileScraper>) -> Self {
        Self { scraper }
    }
}

#[async_trait::async_trait]
impl ProfileStrategy for ScrapeStrategy {
    fn name(&self) -> &'static str {
        "scrape"
    }

    fn source(&self) -> SourceId {
        SourceId::Scrape
    }

    fn should_attempt(&self, observed: &ObservationSet) -> bool {
        !observed.has(FieldName::Headline) && observed.has(FieldName::ProfileUrl)
    }

    async fn fetch(
        &self,
        _token: &AccessToken,
        observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError> {
        // best() ranks Constructed last, so an observed URL wins when present
        let url = observed
            .best_text(FieldName::ProfileUrl)
            .ok_or_else(|| StrategyError::MissingInput("no profile URL to scrape".to_string()))?;

        let guessed = !observed.has_observed(FieldName::ProfileUrl);
        tracing::info!(
            profile_url = %url,
            scraper = self.scraper.name(),
            guessed,
            "Scraping public profile for missing headline"
        );

        let fragment = self.scraper.scrape(url).await?;

        if fragment.is_empty() {
            tracing::info!(profile_url = %url, "Profile page yielded no fields");
            return Ok(Vec::new());
        }

        let observations = fragment.into_observations();
        if !guessed {
            return Ok(observations);
        }

        let total = observations.len();
        let kept: Vec<CandidateObservation> = observations
            .into_iter()
            .filter(|o| o.field == FieldName::Headline)
            .collect();
        if kept.len() < total {
            tracing::debug!(
                profile_url = %url,
                dropped = total - kept.len(),
                "Guessed profile URL: keeping headline only"
            );
        }
        Ok(kept)
    }
}
