//! Import Pipeline Orchestrator
//!
//! Runs one profile import end to end:
//! - **Token exchange**: authorization code → access token (single attempt)
//! - **Source chain**: strategies gather candidate observations
//! - **Merge**: precedence-based field resolution
//! - **Enrichment**: tags and role level from the headline
//! - **Persistence**: idempotent upsert plus audit entry
//!
//! # Error Handling
//! - Strategy failures are isolated and reported, never fatal on their own
//! - A run without an identity id fails with `SourcesFailed` when every
//!   source failed upstream the same way, else with `MergeIncomplete`
//! - An audit write failure is logged and does not undo the upsert

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::source_chain::{ProfileSourceChain, SourceFailure};
use crate::db::profiles::{AuditEntry, ProfileSink, AUDIT_ACTION_IMPORT};
use crate::fusion::{enrich, FieldMergeResolver};
use crate::linkedin::{ClientCredentials, LinkedInClient, LinkedInEndpoints, UpstreamError};
use crate::types::{EnrichedProfile, FieldName, RequestMetadata};
use crate::utils::FailureClass;

/// Input of one import run
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub authorization_code: String,
    pub user_id: String,
    /// Overrides the configured redirect URI when present
    pub redirect_uri: Option<String>,
}

/// Result of a successful import run
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub profile: EnrichedProfile,
    /// Stored record id
    pub import_id: String,
    /// Strategies that failed but did not prevent the import
    pub failures: Vec<SourceFailure>,
}

/// Terminal failure of an import run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request is missing a required value; nothing upstream was called
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// Authorization code could not be exchanged
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(UpstreamError),

    /// Every attempted source failed upstream with the same class, so no
    /// identity id was resolved
    #[error("Profile sources failed ({}): {detail}", class.as_str())]
    SourcesFailed {
        class: FailureClass,
        /// Status of the first failing source
        status: Option<u16>,
        detail: String,
        failures: Vec<SourceFailure>,
    },

    /// No source resolved the member's identity id
    #[error("Profile incomplete: {detail}")]
    MergeIncomplete {
        detail: String,
        failures: Vec<SourceFailure>,
    },

    /// Profile could not be stored
    #[error("Storage error: {0}")]
    Storage(#[from] lpi_common::Error),
}

/// Orchestrates token exchange, source chain, merge, enrichment and storage
pub struct ImportPipeline {
    client: Arc<LinkedInClient>,
    credentials: ClientCredentials,
    default_redirect_uri: Option<String>,
    chain: ProfileSourceChain,
    resolver: FieldMergeResolver,
    sink: Arc<dyn ProfileSink>,
}

impl ImportPipeline {
    pub fn new(
        client: Arc<LinkedInClient>,
        credentials: ClientCredentials,
        default_redirect_uri: Option<String>,
        chain: ProfileSourceChain,
        sink: Arc<dyn ProfileSink>,
    ) -> Self {
        Self {
            client,
            credentials,
            default_redirect_uri,
            chain,
            resolver: FieldMergeResolver::new(),
            sink,
        }
    }

    /// LinkedIn hosts this pipeline talks to
    pub fn endpoints(&self) -> &LinkedInEndpoints {
        self.client.endpoints()
    }

    /// Run one import
    ///
    /// # Errors
    /// See [`PipelineError`]; every variant maps to one HTTP status class.
    pub async fn run(
        &self,
        request: ImportRequest,
        metadata: RequestMetadata,
    ) -> Result<ImportOutcome, PipelineError> {
        let code = request.authorization_code.trim();
        let user_id = request.user_id.trim();

        if code.is_empty() {
            return Err(PipelineError::InputInvalid("authorization_code is required".to_string()));
        }
        if user_id.is_empty() {
            return Err(PipelineError::InputInvalid("user_id is required".to_string()));
        }

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .or(self.default_redirect_uri.as_deref())
            .ok_or_else(|| {
                PipelineError::InputInvalid(
                    "redirect_uri is required when no default is configured".to_string(),
                )
            })?;

        info!(user_id, "Starting LinkedIn profile import");

        // Stage 1: token exchange
        let token = self
            .client
            .exchange_code(code, redirect_uri, &self.credentials)
            .await
            .map_err(PipelineError::TokenExchangeFailed)?;

        // Stage 2: source chain
        let report = self.chain.run(&token).await;

        if !report.has_identity() {
            if let Some((class, first)) = report.uniform_upstream_failure() {
                let status = first.status;
                let detail = format!(
                    "all {} profile sources failed ({}), first: {}",
                    report.failures.len(),
                    class.as_str(),
                    first.message
                );
                error!(user_id, class = class.as_str(), status = ?status, "Import aborted: {}", detail);
                return Err(PipelineError::SourcesFailed {
                    class,
                    status,
                    detail,
                    failures: report.failures,
                });
            }

            let detail = if report.failures.is_empty() {
                "no source returned a member id".to_string()
            } else {
                format!(
                    "no source returned a member id ({} sources failed)",
                    report.failures.len()
                )
            };
            error!(user_id, failures = report.failures.len(), "Import aborted: {}", detail);
            return Err(PipelineError::MergeIncomplete {
                detail,
                failures: report.failures,
            });
        }

        // Stage 3 + 4: merge and enrich
        let merged = self.resolver.resolve(&report.observations);
        let enriched = enrich(merged);

        if enriched.profile.headline.is_empty() {
            info!(user_id, "No source resolved a headline, storing profile without one");
        }

        // Stage 5: persistence
        let record = self.sink.upsert_profile(user_id, &enriched, &metadata).await?;

        let audit = AuditEntry {
            user_id: user_id.to_string(),
            linkedin_id: enriched.profile.identity_id.clone(),
            action: AUDIT_ACTION_IMPORT.to_string(),
            fields_present: enriched
                .profile
                .fields_present()
                .into_iter()
                .map(FieldName::as_str)
                .map(str::to_string)
                .collect(),
            failed_sources: report.failed_sources(),
            user_agent: metadata.user_agent.clone(),
            ip_address: metadata.client_ip.clone(),
            created_at: metadata.timestamp,
        };

        if let Err(e) = self.sink.insert_audit(&audit).await {
            warn!(
                user_id,
                import_id = %record.id,
                error = %e,
                "Failed to write import audit entry (profile kept)"
            );
        }

        info!(
            user_id,
            import_id = %record.id,
            role_level = enriched.role_level.as_str(),
            failed_sources = report.failures.len(),
            "LinkedIn profile import completed"
        );

        Ok(ImportOutcome {
            profile: enriched,
            import_id: record.id,
            failures: report.failures,
        })
    }
}
