//! Legacy profile strategy
//!
//! Queries the versioned `/v2/me` API with three decreasingly-specific field
//! projections and keeps the first that succeeds. Apps are frequently granted
//! only part of the legacy scopes, so a 403 on the richer projection is
//! logged as a permission problem and the next projection is tried.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::linkedin::{LinkedInClient, LinkedInEndpoints, UpstreamError};
use crate::types::{
    AccessToken, CandidateObservation, FieldName, ImageVariant, ObservationSet, ProfileStrategy,
    SourceId, StrategyError,
};

/// Projections in the order they are attempted: (label, projection)
pub const PROJECTIONS: [(&str, Option<&str>); 3] = [
    (
        "me(full)",
        Some("(id,localizedFirstName,localizedLastName,localizedHeadline,vanityName,firstName,lastName,headline,profilePicture(displayImage~:playableStreams))"),
    ),
    (
        "me(basic)",
        Some("(id,localizedFirstName,localizedLastName,localizedHeadline,vanityName)"),
    ),
    ("me", None),
];

const STILL_IMAGE_KEY: &str = "com.linkedin.digitalmedia.mediaartifact.StillImage";

/// `/v2/me` response (every projection is a subset of this)
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyProfile {
    pub id: Option<String>,
    pub localized_first_name: Option<String>,
    pub localized_last_name: Option<String>,
    pub localized_headline: Option<String>,
    pub vanity_name: Option<String>,
    pub first_name: Option<LocalizedString>,
    pub last_name: Option<LocalizedString>,
    pub headline: Option<LocalizedString>,
    pub profile_picture: Option<ProfilePicture>,
}

/// Multi-locale string (`{"localized": {"en_US": "..."}, "preferredLocale": {...}}`)
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalizedString {
    pub localized: BTreeMap<String, String>,
    pub preferred_locale: Option<Locale>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub country: String,
    pub language: String,
}

impl LocalizedString {
    /// Value for the preferred locale, else the first non-empty value
    pub fn resolve(&self) -> Option<&str> {
        let preferred = self.preferred_locale.as_ref().and_then(|l| {
            self.localized
                .get(&format!("{}_{}", l.language, l.country))
                .map(String::as_str)
        });

        preferred
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.localized
                    .values()
                    .map(String::as_str)
                    .find(|v| !v.trim().is_empty())
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePicture {
    #[serde(rename = "displayImage~")]
    pub display_image: Option<DisplayImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DisplayImage {
    pub elements: Vec<ImageElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageElement {
    pub data: BTreeMap<String, serde_json::Value>,
    pub identifiers: Vec<ImageIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageIdentifier {
    pub identifier: String,
}

impl ImageElement {
    /// First identifier URL with the element's display size, if declared
    fn to_variant(&self) -> Option<ImageVariant> {
        let url = self.identifiers.iter().map(|i| i.identifier.trim()).find(|u| !u.is_empty())?;

        let size = self.data.get(STILL_IMAGE_KEY).and_then(|still| still.get("displaySize"));
        let dimension = |key: &str| -> Option<u32> {
            size.and_then(|s| s.get(key))
                .and_then(serde_json::Value::as_f64)
                .filter(|v| *v > 0.0)
                .map(|v| v.round() as u32)
        };

        Some(ImageVariant::new(url, dimension("width"), dimension("height")))
    }
}

impl LegacyProfile {
    /// Convert the response into observations
    pub fn into_observations(self, endpoints: &LinkedInEndpoints) -> Vec<CandidateObservation> {
        let source = SourceId::LegacyApi;
        let mut out = Vec::new();

        out.extend(self.id.and_then(|v| CandidateObservation::text(source, FieldName::IdentityId, v)));

        let given = self
            .localized_first_name
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.first_name.as_ref().and_then(|l| l.resolve()).map(str::to_string));
        let family = self
            .localized_last_name
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.last_name.as_ref().and_then(|l| l.resolve()).map(str::to_string));
        let headline = self
            .localized_headline
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.headline.as_ref().and_then(|l| l.resolve()).map(str::to_string));

        out.extend(given.and_then(|v| CandidateObservation::text(source, FieldName::GivenName, v)));
        out.extend(family.and_then(|v| CandidateObservation::text(source, FieldName::FamilyName, v)));
        out.extend(headline.and_then(|v| CandidateObservation::text(source, FieldName::Headline, v)));

        out.extend(
            self.vanity_name
                .filter(|v| !v.trim().is_empty())
                .and_then(|v| {
                    CandidateObservation::text(
                        source,
                        FieldName::ProfileUrl,
                        endpoints.public_profile_url(v.trim()),
                    )
                }),
        );

        let variants: Vec<ImageVariant> = self
            .profile_picture
            .and_then(|p| p.display_image)
            .map(|d| d.elements.iter().filter_map(ImageElement::to_variant).collect())
            .unwrap_or_default();
        out.extend(CandidateObservation::images(source, variants));

        out
    }
}

/// Legacy profile strategy
///
/// Skipped when earlier sources already observed every field.
pub struct LegacyProfileStrategy {
    client: Arc<LinkedInClient>,
}

impl LegacyProfileStrategy {
    pub fn new(client: Arc<LinkedInClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ProfileStrategy for LegacyProfileStrategy {
    fn name(&self) -> &'static str {
        "legacy_profile"
    }

    fn source(&self) -> SourceId {
        SourceId::LegacyApi
    }

    fn should_attempt(&self, observed: &ObservationSet) -> bool {
        !observed.is_complete()
    }

    async fn fetch(
        &self,
        token: &AccessToken,
        _observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError> {
        let endpoints = self.client.endpoints();
        let mut last_error: Option<UpstreamError> = None;

        for (label, projection) in PROJECTIONS {
            let url = endpoints.me_url(projection);

            match self.client.get_json::<LegacyProfile>(label, &url, token).await {
                Ok(profile) => {
                    let observations = profile.into_observations(endpoints);
                    tracing::info!(
                        projection = label,
                        fields = observations.len(),
                        "Legacy profile fetched"
                    );
                    return Ok(observations);
                }
                Err(err) => {
                    if err.is_forbidden() {
                        tracing::warn!(
                            projection = label,
                            status = 403,
                            body = %err.body,
                            "Legacy profile projection forbidden, likely missing r_liteprofile/r_basicprofile scope"
                        );
                    } else {
                        tracing::warn!(
                            projection = label,
                            error = %err,
                            "Legacy profile projection failed"
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(last) => Err(StrategyError::Exhausted {
                attempted: PROJECTIONS.len(),
                last,
            }),
            None => Err(StrategyError::MissingInput("no projections configured".to_string())),
        }
    }
}
