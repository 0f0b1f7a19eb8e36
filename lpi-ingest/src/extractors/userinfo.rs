//! UserInfo strategy
//!
//! Queries the OpenID Connect UserInfo endpoint. A 404 means the
//! standards-based route is not enabled for this app, so the
//! provider-specific equivalent is tried with the same call shape. Any other
//! failure ends the strategy.

use serde::Deserialize;
use std::sync::Arc;

use crate::linkedin::{LinkedInClient, UpstreamError};
use crate::types::{
    AccessToken, CandidateObservation, FieldName, ImageVariant, ObservationSet, ProfileStrategy,
    SourceId, StrategyError,
};

/// OIDC UserInfo claims (plus LinkedIn extras some apps receive)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserInfoClaims {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
    pub locale: Option<serde_json::Value>,
    pub headline: Option<String>,
    pub profile: Option<String>,
    pub profile_url: Option<String>,
}

impl UserInfoClaims {
    /// Convert claims into observations
    ///
    /// When only `name` is present it is split on the first space into
    /// given/family name.
    pub fn into_observations(self) -> Vec<CandidateObservation> {
        let source = SourceId::UserInfo;
        let mut out = Vec::new();

        out.extend(self.sub.and_then(|v| CandidateObservation::text(source, FieldName::IdentityId, v)));

        let (split_given, split_family) = match self.name.as_deref().map(str::trim) {
            Some(full) if !full.is_empty() => match full.split_once(' ') {
                Some((given, family)) => (Some(given.to_string()), Some(family.trim().to_string())),
                None => (Some(full.to_string()), None),
            },
            _ => (None, None),
        };
        let given = self.given_name.filter(|v| !v.trim().is_empty()).or(split_given);
        let family = self.family_name.filter(|v| !v.trim().is_empty()).or(split_family);

        out.extend(given.and_then(|v| CandidateObservation::text(source, FieldName::GivenName, v)));
        out.extend(family.and_then(|v| CandidateObservation::text(source, FieldName::FamilyName, v)));
        out.extend(self.headline.and_then(|v| CandidateObservation::text(source, FieldName::Headline, v)));
        out.extend(self.email.and_then(|v| CandidateObservation::text(source, FieldName::Email, v)));
        out.extend(
            self.picture
                .and_then(|url| CandidateObservation::images(source, vec![ImageVariant::new(url, None, None)])),
        );
        out.extend(
            self.profile_url
                .or(self.profile)
                .and_then(|v| CandidateObservation::text(source, FieldName::ProfileUrl, v)),
        );

        out
    }
}

/// UserInfo strategy (always attempted, first in the chain)
pub struct UserInfoStrategy {
    client: Arc<LinkedInClient>,
}

impl UserInfoStrategy {
    pub fn new(client: Arc<LinkedInClient>) -> Self {
        Self { client }
    }

    async fn fetch_claims(&self, token: &AccessToken) -> Result<UserInfoClaims, StrategyError> {
        let endpoints = self.client.endpoints();

        match self
            .client
            .get_json::<UserInfoClaims>("userinfo", &endpoints.userinfo_url(), token)
            .await
        {
            Ok(claims) => Ok(claims),
            Err(err) if err.is_not_found() => {
                tracing::info!(
                    status = 404,
                    "UserInfo endpoint not found, trying provider-specific endpoint"
                );
                self.client
                    .get_json::<UserInfoClaims>(
                        "userinfo(oauth)",
                        &endpoints.userinfo_fallback_url(),
                        token,
                    )
                    .await
                    .map_err(|last: UpstreamError| StrategyError::Exhausted { attempted: 2, last })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait::async_trait]
impl ProfileStrategy for UserInfoStrategy {
    fn name(&self) -> &'static str {
        "userinfo"
    }

    fn source(&self) -> SourceId {
        SourceId::UserInfo
    }

    fn should_attempt(&self, _observed: &ObservationSet) -> bool {
        true
    }

    async fn fetch(
        &self,
        token: &AccessToken,
        _observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError> {
        let claims = self.fetch_claims(token).await?;
        let observations = claims.into_observations();

        tracing::debug!(fields = observations.len(), "UserInfo claims extracted");

        Ok(observations)
    }
}
