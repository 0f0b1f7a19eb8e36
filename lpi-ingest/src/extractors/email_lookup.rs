//! Email lookup strategy
//!
//! Consulted only when no earlier source produced an email address.

use serde::Deserialize;
use std::sync::Arc;

use crate::linkedin::LinkedInClient;
use crate::types::{
    AccessToken, CandidateObservation, FieldName, ObservationSet, ProfileStrategy, SourceId,
    StrategyError,
};

/// `/v2/emailAddress?q=members&projection=(elements*(handle~))` response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailAddressResponse {
    pub elements: Vec<EmailElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailElement {
    #[serde(rename = "handle~")]
    pub handle: Option<EmailHandle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailHandle {
    pub email_address: Option<String>,
}

impl EmailAddressResponse {
    /// First non-empty email address in the response
    pub fn primary_email(&self) -> Option<&str> {
        self.elements
            .iter()
            .filter_map(|e| e.handle.as_ref()?.email_address.as_deref())
            .map(str::trim)
            .find(|e| !e.is_empty())
    }
}

pub struct EmailLookupStrategy {
    client: Arc<LinkedInClient>,
}

impl EmailLookupStrategy {
    pub fn new(client: Arc<LinkedInClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ProfileStrategy for EmailLookupStrategy {
    fn name(&self) -> &'static str {
        "email_lookup"
    }

    fn source(&self) -> SourceId {
        SourceId::EmailLookup
    }

    fn should_attempt(&self, observed: &ObservationSet) -> bool {
        !observed.has(FieldName::Email)
    }

    async fn fetch(
        &self,
        token: &AccessToken,
        _observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError> {
        let url = self.client.endpoints().email_url();
        let response: EmailAddressResponse = self.client.get_json("email", &url, token).await?;

        match response.primary_email() {
            Some(email) => Ok(CandidateObservation::text(SourceId::EmailLookup, FieldName::Email, email)
                .into_iter()
                .collect()),
            None => {
                tracing::debug!("Email lookup returned no addresses");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_email_from_handle() {
        let response: EmailAddressResponse = serde_json::from_str(
            r#"{"elements": [{"handle": "urn:li:emailAddress:3775708763", "handle~": {"emailAddress": "hsimpson@linkedin.com"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.primary_email(), Some("hsimpson@linkedin.com"));
    }

    #[test]
    fn test_empty_elements() {
        let response: EmailAddressResponse = serde_json::from_str(r#"{"elements": []}"#).unwrap();
        assert_eq!(response.primary_email(), None);

        let response: EmailAddressResponse =
            serde_json::from_str(r#"{"elements": [{"handle~": {"emailAddress": " "}}]}"#).unwrap();
        assert_eq!(response.primary_email(), None);
    }
}
