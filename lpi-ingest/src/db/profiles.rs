//! Profile persistence and import audit
//!
//! One row per LinkedIn member in `linkedin_profiles`, keyed by the
//! provider's identity id, plus an append-only `linkedin_import_audit` trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use lpi_common::{Error, Result};

use crate::types::{EnrichedProfile, MergedProfile, ProfileProvenance, RequestMetadata, RoleLevel};
use crate::utils::{invoke_with_retry, RetryPolicy};

/// Status written for a completed import
pub const IMPORT_STATUS_COMPLETED: &str = "completed";

/// Audit action for a profile import
pub const AUDIT_ACTION_IMPORT: &str = "profile_import";

/// A stored profile row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedProfileRecord {
    /// Record id (stable across re-imports of the same member)
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub profile: EnrichedProfile,
    pub import_status: String,
    pub consent_given_at: DateTime<Utc>,
    pub consent_user_agent: String,
    pub consent_ip_address: String,
    pub last_fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One audit trail entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub user_id: String,
    pub linkedin_id: String,
    pub action: String,
    /// Profile fields that carried a value
    pub fields_present: Vec<String>,
    /// Strategies that failed during the run
    pub failed_sources: Vec<String>,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

/// Storage boundary for the import pipeline
#[async_trait]
pub trait ProfileSink: Send + Sync {
    /// Insert or replace the profile for `profile.identity_id`
    ///
    /// Atomic and idempotent; the returned record id does not change when
    /// the same member is imported again.
    async fn upsert_profile(
        &self,
        user_id: &str,
        profile: &EnrichedProfile,
        metadata: &RequestMetadata,
    ) -> Result<PersistedProfileRecord>;

    /// Append an audit entry
    async fn insert_audit(&self, entry: &AuditEntry) -> Result<()>;
}

/// SQLite-backed sink
pub struct SqliteProfileSink {
    pool: SqlitePool,
    lock_retry: RetryPolicy,
}

impl SqliteProfileSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lock_retry: RetryPolicy::lock_contention(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProfileSink for SqliteProfileSink {
    async fn upsert_profile(
        &self,
        user_id: &str,
        profile: &EnrichedProfile,
        metadata: &RequestMetadata,
    ) -> Result<PersistedProfileRecord> {
        let merged = &profile.profile;
        if merged.identity_id.is_empty() {
            return Err(Error::InvalidInput(
                "cannot store a profile without an identity id".to_string(),
            ));
        }

        // Prepare all data BEFORE acquiring a database connection
        let new_id = Uuid::new_v4().to_string();
        let provenance = serde_json::to_string(&merged.provenance)
            .map_err(|e| Error::Internal(format!("Failed to serialize provenance: {}", e)))?;
        let tags = serde_json::to_string(&profile.tags)
            .map_err(|e| Error::Internal(format!("Failed to serialize tags: {}", e)))?;
        let now = metadata.timestamp;
        let now_str = now.to_rfc3339();

        let (pool, id_ref, provenance, tags, now_ref) =
            (&self.pool, new_id.as_str(), provenance.as_str(), tags.as_str(), now_str.as_str());

        let row = invoke_with_retry("upsert_profile", &self.lock_retry, |_| async move {
            sqlx::query(
                r#"
                INSERT INTO linkedin_profiles (
                    id, user_id, linkedin_id, first_name, last_name, headline, email,
                    profile_picture_url, profile_url, profile_url_guessed, provenance, tags,
                    role_level, import_status, consent_given_at, consent_user_agent,
                    consent_ip_address, last_fetched_at, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(linkedin_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    headline = excluded.headline,
                    email = excluded.email,
                    profile_picture_url = excluded.profile_picture_url,
                    profile_url = excluded.profile_url,
                    profile_url_guessed = excluded.profile_url_guessed,
                    provenance = excluded.provenance,
                    tags = excluded.tags,
                    role_level = excluded.role_level,
                    import_status = excluded.import_status,
                    consent_given_at = excluded.consent_given_at,
                    consent_user_agent = excluded.consent_user_agent,
                    consent_ip_address = excluded.consent_ip_address,
                    last_fetched_at = excluded.last_fetched_at,
                    updated_at = excluded.updated_at
                RETURNING id, created_at
                "#,
            )
            .bind(id_ref)
            .bind(user_id)
            .bind(&merged.identity_id)
            .bind(&merged.given_name)
            .bind(&merged.family_name)
            .bind(&merged.headline)
            .bind(&merged.email)
            .bind(&merged.avatar_url)
            .bind(&merged.profile_url)
            .bind(merged.profile_url_guessed)
            .bind(provenance)
            .bind(tags)
            .bind(profile.role_level.as_str())
            .bind(IMPORT_STATUS_COMPLETED)
            .bind(now_ref)
            .bind(&metadata.user_agent)
            .bind(&metadata.client_ip)
            .bind(now_ref)
            .bind(now_ref)
            .bind(now_ref)
            .fetch_one(pool)
            .await
            .map_err(Error::Database)
        })
        .await?;

        let id: String = row.get("id");
        let created_at: String = row.get("created_at");
        let created_at = lpi_common::time::parse_rfc3339(&created_at)?;

        tracing::info!(
            record_id = %id,
            linkedin_id = %merged.identity_id,
            user_id,
            replaced = id != new_id,
            "Profile upserted"
        );

        Ok(PersistedProfileRecord {
            id,
            user_id: user_id.to_string(),
            profile: profile.clone(),
            import_status: IMPORT_STATUS_COMPLETED.to_string(),
            consent_given_at: now,
            consent_user_agent: metadata.user_agent.clone(),
            consent_ip_address: metadata.client_ip.clone(),
            last_fetched_at: now,
            created_at,
            updated_at: now,
        })
    }

    async fn insert_audit(&self, entry: &AuditEntry) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let fields_present = serde_json::to_string(&entry.fields_present)
            .map_err(|e| Error::Internal(format!("Failed to serialize fields_present: {}", e)))?;
        let failed_sources = serde_json::to_string(&entry.failed_sources)
            .map_err(|e| Error::Internal(format!("Failed to serialize failed_sources: {}", e)))?;
        let created_at = entry.created_at.to_rfc3339();

        let (pool, id, fields_present, failed_sources, created_at) = (
            &self.pool,
            id.as_str(),
            fields_present.as_str(),
            failed_sources.as_str(),
            created_at.as_str(),
        );

        invoke_with_retry("insert_audit", &self.lock_retry, |_| async move {
            sqlx::query(
                r#"
                INSERT INTO linkedin_import_audit (
                    id, user_id, linkedin_id, action, fields_present, failed_sources,
                    user_agent, ip_address, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(&entry.user_id)
            .bind(&entry.linkedin_id)
            .bind(&entry.action)
            .bind(fields_present)
            .bind(failed_sources)
            .bind(&entry.user_agent)
            .bind(&entry.ip_address)
            .bind(created_at)
            .execute(pool)
            .await
            .map_err(Error::Database)?;

            Ok::<(), Error>(())
        })
        .await
    }
}

/// Most recently updated profile owned by `user_id`
pub async fn get_profile_by_user(pool: &SqlitePool, user_id: &str) -> Result<Option<PersistedProfileRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, linkedin_id, first_name, last_name, headline, email,
               profile_picture_url, profile_url, profile_url_guessed, provenance, tags,
               role_level, import_status, consent_given_at, consent_user_agent,
               consent_ip_address, last_fetched_at, created_at, updated_at
        FROM linkedin_profiles
        WHERE user_id = ?
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let provenance: String = row.get("provenance");
    let provenance: ProfileProvenance = serde_json::from_str(&provenance)
        .map_err(|e| Error::Internal(format!("Failed to deserialize provenance: {}", e)))?;

    let tags: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| Error::Internal(format!("Failed to deserialize tags: {}", e)))?;

    let role_level: String = row.get("role_level");
    let role_level = RoleLevel::parse(&role_level)
        .ok_or_else(|| Error::Internal(format!("Unknown role level '{}'", role_level)))?;

    let timestamp = |column: &str| -> Result<DateTime<Utc>> {
        let value: String = row.get(column);
        lpi_common::time::parse_rfc3339(&value)
    };

    Ok(Some(PersistedProfileRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        profile: EnrichedProfile {
            profile: MergedProfile {
                identity_id: row.get("linkedin_id"),
                given_name: row.get("first_name"),
                family_name: row.get("last_name"),
                headline: row.get("headline"),
                email: row.get("email"),
                avatar_url: row.get("profile_picture_url"),
                profile_url: row.get("profile_url"),
                profile_url_guessed: row.get("profile_url_guessed"),
                provenance,
            },
            tags,
            role_level,
        },
        import_status: row.get("import_status"),
        consent_given_at: timestamp("consent_given_at")?,
        consent_user_agent: row.get("consent_user_agent"),
        consent_ip_address: row.get("consent_ip_address"),
        last_fetched_at: timestamp("last_fetched_at")?,
        created_at: timestamp("created_at")?,
        updated_at: timestamp("updated_at")?,
    }))
}

/// Number of audit entries recorded for `user_id`
pub async fn count_audit_entries(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM linkedin_import_audit WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
