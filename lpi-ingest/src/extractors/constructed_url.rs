//! Constructed profile URL
//!
//! Guesses `/in/{given}-{family}` when no source observed a profile URL.
//! The guess is tagged `SourceId::Constructed`, which sits last in the merge
//! precedence, so it can never replace an observed URL. No network access.

use crate::linkedin::LinkedInEndpoints;
use crate::types::{
    AccessToken, CandidateObservation, FieldName, ObservationSet, ProfileStrategy, SourceId,
    StrategyError,
};

/// Lowercase slug: alphanumerics kept, everything else collapsed into `-`
pub fn slugify(parts: &[&str]) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for ch in parts.join(" ").chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

pub struct ConstructedUrlStrategy {
    endpoints: LinkedInEndpoints,
}

impl ConstructedUrlStrategy {
    pub fn new(endpoints: LinkedInEndpoints) -> Self {
        Self { endpoints }
    }

    /// Guessed URL from the best-known names, if any
    pub fn guess(&self, observed: &ObservationSet) -> Option<String> {
        let given = observed.best_text(FieldName::GivenName).unwrap_or_default();
        let family = observed.best_text(FieldName::FamilyName).unwrap_or_default();

        let slug = slugify(&[given, family]);
        if slug.is_empty() {
            None
        } else {
            Some(self.endpoints.public_profile_url(&slug))
        }
    }
}

#[async_trait::async_trait]
impl ProfileStrategy for ConstructedUrlStrategy {
    fn name(&self) -> &'static str {
        "constructed_url"
    }

    fn source(&self) -> SourceId {
        SourceId::Constructed
    }

    fn should_attempt(&self, observed: &ObservationSet) -> bool {
        !observed.has(FieldName::ProfileUrl)
            && (observed.has(FieldName::GivenName) || observed.has(FieldName::FamilyName))
    }

    async fn fetch(
        &self,
        _token: &AccessToken,
        observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError> {
        let url = self
            .guess(observed)
            .ok_or_else(|| StrategyError::MissingInput("no usable name for profile URL".to_string()))?;

        tracing::info!(profile_url = %url, "Constructed fallback profile URL from name");

        Ok(CandidateObservation::text(SourceId::Constructed, FieldName::ProfileUrl, url)
            .into_iter()
            .collect())
    }
}
