//! Core Types and Trait Definitions for lpi-ingest
//!
//! Defines the data contracts between the pipeline stages:
//! - **Source chain:** `ProfileStrategy` implementations emit `CandidateObservation`s
//! - **Merge:** `ObservationSet` → `MergedProfile` (with per-field provenance)
//! - **Enrichment:** `MergedProfile` → `EnrichedProfile`
//!
//! Observations are immutable once created and live only for one pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::linkedin::client::UpstreamError;

// ============================================================================
// Sources and Fields
// ============================================================================

/// Source that proposed a field value (for provenance tracking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Public profile page scrape
    Scrape,
    /// Legacy versioned profile API (`/v2/me`)
    LegacyApi,
    /// Dedicated email lookup endpoint
    EmailLookup,
    /// OpenID Connect UserInfo endpoint
    UserInfo,
    /// Guessed from other fields (never observed)
    Constructed,
}

impl SourceId {
    /// Total precedence order used by the merge resolver, highest first
    pub const PRECEDENCE: [SourceId; 5] = [
        SourceId::Scrape,
        SourceId::LegacyApi,
        SourceId::EmailLookup,
        SourceId::UserInfo,
        SourceId::Constructed,
    ];

    /// Rank of this source in `PRECEDENCE` (0 wins)
    pub fn priority(self) -> SourcePriority {
        match self {
            SourceId::Scrape => SourcePriority(0),
            SourceId::LegacyApi => SourcePriority(1),
            SourceId::EmailLookup => SourcePriority(2),
            SourceId::UserInfo => SourcePriority(3),
            SourceId::Constructed => SourcePriority(4),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Scrape => "scrape",
            SourceId::LegacyApi => "legacy_api",
            SourceId::EmailLookup => "email_lookup",
            SourceId::UserInfo => "user_info",
            SourceId::Constructed => "constructed",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank of a source in the precedence table; lower ranks win
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePriority(pub u8);

/// Profile attribute an observation speaks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    IdentityId,
    GivenName,
    FamilyName,
    Headline,
    Email,
    Avatar,
    ProfileUrl,
}

impl FieldName {
    pub const ALL: [FieldName; 7] = [
        FieldName::IdentityId,
        FieldName::GivenName,
        FieldName::FamilyName,
        FieldName::Headline,
        FieldName::Email,
        FieldName::Avatar,
        FieldName::ProfileUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::IdentityId => "identity_id",
            FieldName::GivenName => "given_name",
            FieldName::FamilyName => "family_name",
            FieldName::Headline => "headline",
            FieldName::Email => "email",
            FieldName::Avatar => "avatar_url",
            FieldName::ProfileUrl => "profile_url",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Candidate Observations
// ============================================================================

/// One rendition of a profile picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageVariant {
    pub fn new(url: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }

    /// Pixel area, when both dimensions are known
    pub fn area(&self) -> Option<u64> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(u64::from(w) * u64::from(h)),
            _ => None,
        }
    }
}

/// Value carried by an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedValue {
    Text(String),
    /// Image variants in the order the source listed them
    Images(Vec<ImageVariant>),
}

/// A single field value proposed by one source
///
/// Construct through [`CandidateObservation::text`] or
/// [`CandidateObservation::images`], which drop blank values so an
/// observation always carries something usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateObservation {
    pub source: SourceId,
    pub field: FieldName,
    pub value: ObservedValue,
    pub confidence: SourcePriority,
}

impl CandidateObservation {
    /// Text observation; `None` when the value is blank
    pub fn text(source: SourceId, field: FieldName, value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }

        Some(Self {
            source,
            field,
            value: ObservedValue::Text(trimmed.to_string()),
            confidence: source.priority(),
        })
    }

    /// Avatar observation; `None` when no variant has a usable URL
    pub fn images(source: SourceId, variants: Vec<ImageVariant>) -> Option<Self> {
        let variants: Vec<ImageVariant> = variants
            .into_iter()
            .filter(|v| !v.url.trim().is_empty())
            .collect();
        if variants.is_empty() {
            return None;
        }

        Some(Self {
            source,
            field: FieldName::Avatar,
            value: ObservedValue::Images(variants),
            confidence: source.priority(),
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            ObservedValue::Text(s) => Some(s),
            ObservedValue::Images(_) => None,
        }
    }
}

/// Append-only set of observations gathered during one pipeline run
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    observations: Vec<CandidateObservation>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: CandidateObservation) {
        self.observations.push(observation);
    }

    pub fn extend(&mut self, observations: impl IntoIterator<Item = CandidateObservation>) {
        self.observations.extend(observations);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Whether any source observed `field`
    pub fn has(&self, field: FieldName) -> bool {
        self.observations.iter().any(|o| o.field == field)
    }

    /// Whether `field` was observed by a source other than `Constructed`
    pub fn has_observed(&self, field: FieldName) -> bool {
        self.observations
            .iter()
            .any(|o| o.field == field && o.source != SourceId::Constructed)
    }

    /// Highest-precedence observation for `field`
    pub fn best(&self, field: FieldName) -> Option<&CandidateObservation> {
        self.observations
            .iter()
            .filter(|o| o.field == field)
            .min_by_key(|o| o.confidence)
    }

    /// Highest-precedence text value for `field`
    pub fn best_text(&self, field: FieldName) -> Option<&str> {
        self.best(field).and_then(CandidateObservation::as_text)
    }

    /// Every field has at least one observation
    pub fn is_complete(&self) -> bool {
        FieldName::ALL.iter().all(|f| self.has(*f))
    }
}

// ============================================================================
// Access Token
// ============================================================================

/// Bearer credential for one pipeline run; never persisted or logged
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

// ============================================================================
// Merged and Enriched Profiles
// ============================================================================

/// Which source won each attribute; `None` means canonically empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProvenance {
    pub identity_id: Option<SourceId>,
    pub given_name: Option<SourceId>,
    pub family_name: Option<SourceId>,
    pub headline: Option<SourceId>,
    pub email: Option<SourceId>,
    pub avatar_url: Option<SourceId>,
    pub profile_url: Option<SourceId>,
}

impl ProfileProvenance {
    pub fn get(&self, field: FieldName) -> Option<SourceId> {
        match field {
            FieldName::IdentityId => self.identity_id,
            FieldName::GivenName => self.given_name,
            FieldName::FamilyName => self.family_name,
            FieldName::Headline => self.headline,
            FieldName::Email => self.email,
            FieldName::Avatar => self.avatar_url,
            FieldName::ProfileUrl => self.profile_url,
        }
    }

    pub fn set(&mut self, field: FieldName, source: Option<SourceId>) {
        let slot = match field {
            FieldName::IdentityId => &mut self.identity_id,
            FieldName::GivenName => &mut self.given_name,
            FieldName::FamilyName => &mut self.family_name,
            FieldName::Headline => &mut self.headline,
            FieldName::Email => &mut self.email,
            FieldName::Avatar => &mut self.avatar_url,
            FieldName::ProfileUrl => &mut self.profile_url,
        };
        *slot = source;
    }
}

/// The single resolved profile record
///
/// Unresolved attributes are empty strings with `None` provenance; no key is
/// ever missing from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedProfile {
    pub identity_id: String,
    pub given_name: String,
    pub family_name: String,
    pub headline: String,
    pub email: String,
    pub avatar_url: String,
    pub profile_url: String,
    /// True when `profile_url` was constructed from the name, not observed
    pub profile_url_guessed: bool,
    pub provenance: ProfileProvenance,
}

impl MergedProfile {
    pub fn value(&self, field: FieldName) -> &str {
        match field {
            FieldName::IdentityId => &self.identity_id,
            FieldName::GivenName => &self.given_name,
            FieldName::FamilyName => &self.family_name,
            FieldName::Headline => &self.headline,
            FieldName::Email => &self.email,
            FieldName::Avatar => &self.avatar_url,
            FieldName::ProfileUrl => &self.profile_url,
        }
    }

    /// Fields carrying a non-empty value
    pub fn fields_present(&self) -> Vec<FieldName> {
        FieldName::ALL
            .iter()
            .copied()
            .filter(|f| !self.value(*f).is_empty())
            .collect()
    }
}

/// Seniority/role bucket derived from the headline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleLevel {
    Senior,
    Junior,
    Engineer,
    Student,
    Professional,
}

impl RoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RoleLevel::Senior => "senior",
            RoleLevel::Junior => "junior",
            RoleLevel::Engineer => "engineer",
            RoleLevel::Student => "student",
            RoleLevel::Professional => "professional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "senior" => Some(RoleLevel::Senior),
            "junior" => Some(RoleLevel::Junior),
            "engineer" => Some(RoleLevel::Engineer),
            "student" => Some(RoleLevel::Student),
            "professional" => Some(RoleLevel::Professional),
            _ => None,
        }
    }
}

/// Merged profile plus derived attributes
///
/// Derived fields are recomputable from the merged profile and never feed
/// back into merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedProfile {
    #[serde(flatten)]
    pub profile: MergedProfile,
    pub tags: Vec<String>,
    pub role_level: RoleLevel,
}

/// Caller context recorded as consent/audit metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    pub user_agent: String,
    pub client_ip: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RequestMetadata {
    pub fn new(user_agent: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client_ip: client_ip.into(),
            timestamp: lpi_common::time::now(),
        }
    }
}

// ============================================================================
// Profile Strategy Trait
// ============================================================================

/// One independent attempt to fetch profile data from a specific source
///
/// Strategies run strictly in order. `should_attempt` sees everything
/// gathered so far, which lets later strategies skip when earlier ones
/// already filled the gaps they exist for.
#[async_trait::async_trait]
pub trait ProfileStrategy: Send + Sync {
    /// Strategy name for logging and failure reports
    fn name(&self) -> &'static str;

    /// Source tag attached to everything this strategy emits
    fn source(&self) -> SourceId;

    /// Gate evaluated against the observations gathered so far
    fn should_attempt(&self, observed: &ObservationSet) -> bool;

    /// Fetch candidate observations
    ///
    /// # Errors
    /// Returns `StrategyError` when the strategy contributed nothing; the
    /// chain logs it and continues.
    async fn fetch(
        &self,
        token: &AccessToken,
        observed: &ObservationSet,
    ) -> Result<Vec<CandidateObservation>, StrategyError>;
}

/// Failure of a single strategy
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Upstream call failed after any retries
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Every fallback (endpoint or projection) failed; the last error is kept
    #[error("all {attempted} fallbacks failed, last: {last}")]
    Exhausted { attempted: usize, last: UpstreamError },

    /// Response was successful but unusable
    #[error("Parse error: {0}")]
    Parse(String),

    /// Strategy needs an input that earlier sources did not provide
    #[error("Missing input: {0}")]
    MissingInput(String),
}
