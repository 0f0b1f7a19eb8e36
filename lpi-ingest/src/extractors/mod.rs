//! Profile Source Strategies
//!
//! One strategy per way of learning about the member. Each implements the
//! `ProfileStrategy` trait from the `types` module.
//!
//! # Strategies (chain order)
//! 1. **userinfo** - OIDC UserInfo (always attempted)
//! 2. **legacy_profile** - `/v2/me` projections, while any field is missing
//! 3. **email_lookup** - `/v2/emailAddress`, while no email is known
//! 4. **constructed_url** - `/in/{given}-{family}` guess, while no URL is known
//! 5. **scrape** - public profile page, while no headline is known
//!
//! Strategies run sequentially because each gate depends on what earlier
//! strategies found. A failed strategy is reported and skipped.

pub mod constructed_url;
pub mod email_lookup;
pub mod legacy_profile;
pub mod scrape;
pub mod userinfo;

pub use constructed_url::ConstructedUrlStrategy;
pub use email_lookup::EmailLookupStrategy;
pub use legacy_profile::LegacyProfileStrategy;
pub use scrape::ScrapeStrategy;
pub use userinfo::UserInfoStrategy;

use std::sync::Arc;

use crate::linkedin::LinkedInClient;
use crate::scraper::ProfileScraper;
use crate::types::ProfileStrategy;

/// Standard strategy list in chain order
pub fn default_strategies(
    client: Arc<LinkedInClient>,
    scraper: Arc<dyn ProfileScraper>,
) -> Vec<Box<dyn ProfileStrategy>> {
    let endpoints = client.endpoints().clone();

    vec![
        Box::new(UserInfoStrategy::new(Arc::clone(&client))),
        Box::new(LegacyProfileStrategy::new(Arc::clone(&client))),
        Box::new(EmailLookupStrategy::new(client)),
        Box::new(ConstructedUrlStrategy::new(endpoints)),
        Box::new(ScrapeStrategy::new(scraper)),
    ]
}

// ============================================================================
// Mock Strategy for Testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use crate::linkedin::UpstreamError;
    use crate::types::{
        AccessToken, CandidateObservation, FieldName, ObservationSet, ProfileStrategy, SourceId,
        StrategyError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Mock strategy emitting fixed text observations
    pub struct MockStrategy {
        pub name: &'static str,
        pub source: SourceId,
        pub fields: Vec<(FieldName, &'static str)>,
        pub gate: Option<FieldName>,
        pub fail_status: Option<u16>,
        pub calls: Arc<AtomicUsize>,
    }

    impl MockStrategy {
        pub fn new(name: &'static str, source: SourceId, fields: Vec<(FieldName, &'static str)>) -> Self {
            Self {
                name,
                source,
                fields,
                gate: None,
                fail_status: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Fail every call with the given HTTP status
        pub fn failing(name: &'static str, source: SourceId, status: u16) -> Self {
            Self {
                fail_status: Some(status),
                ..Self::new(name, source, Vec::new())
            }
        }

        /// Only attempt while `field` is unobserved
        pub fn gated_on(mut self, field: FieldName) -> Self {
            self.gate = Some(field);
            self
        }

        pub fn call_count(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl ProfileStrategy for MockStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn source(&self) -> SourceId {
            self.source
        }

        fn should_attempt(&self, observed: &ObservationSet) -> bool {
            self.gate.map_or(true, |field| !observed.has(field))
        }

        async fn fetch(
            &self,
            _token: &AccessToken,
            _observed: &ObservationSet,
        ) -> Result<Vec<CandidateObservation>, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(status) = self.fail_status {
                return Err(UpstreamError::from_status(self.name, status, "mock failure").into());
            }

            Ok(self
                .fields
                .iter()
                .filter_map(|(field, value)| CandidateObservation::text(self.source, *field, value))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkedin::LinkedInEndpoints;
    use crate::scraper::PageScraper;
    use crate::utils::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn test_default_chain_order() {
        let client = Arc::new(
            LinkedInClient::new(
                LinkedInEndpoints::default(),
                Duration::from_secs(1),
                RetryPolicy::no_retry(),
            )
            .unwrap(),
        );
        let scraper: Arc<dyn ProfileScraper> = Arc::new(PageScraper::new(Duration::from_secs(1)).unwrap());

        let names: Vec<&str> = default_strategies(client, scraper)
            .iter()
            .map(|s| s.name())
            .collect();

        assert_eq!(
            names,
            ["userinfo", "legacy_profile", "email_lookup", "constructed_url", "scrape"]
        );
    }
}
