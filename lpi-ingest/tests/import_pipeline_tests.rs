//! Import pipeline integration tests
//!
//! Drives `ImportPipeline::run` against a fake LinkedIn server and an
//! in-memory database.

mod helpers;

use async_trait::async_trait;
use helpers::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lpi_ingest::db::profiles::count_audit_entries;
use lpi_ingest::db::{
    get_profile_by_user, AuditEntry, PersistedProfileRecord, ProfileSink, SqliteProfileSink,
};
use lpi_ingest::types::{EnrichedProfile, RequestMetadata, RoleLevel, SourceId};
use lpi_ingest::workflow::{ImportRequest, PipelineError};

fn request(user_id: &str) -> ImportRequest {
    ImportRequest {
        authorization_code: "auth-code-123".to_string(),
        user_id: user_id.to_string(),
        redirect_uri: None,
    }
}

fn metadata() -> RequestMetadata {
    RequestMetadata::new("integration-test/1.0", "203.0.113.7")
}

fn legacy_profile(headline: &str) -> serde_json::Value {
    json!({
        "id": "li-jane-001",
        "localizedFirstName": "Jane",
        "localizedLastName": "Doe",
        "localizedHeadline": headline,
        "vanityName": "janedoe",
        "profilePicture": {
            "displayImage~": {
                "elements": [
                    {
                        "data": { "com.linkedin.digitalmedia.mediaartifact.StillImage": { "displaySize": { "width": 100.0, "height": 100.0 } } },
                        "identifiers": [ { "identifier": "https://media.example.com/jane-100.jpg" } ]
                    },
                    {
                        "data": { "com.linkedin.digitalmedia.mediaartifact.StillImage": { "displaySize": { "width": 400.0, "height": 400.0 } } },
                        "identifiers": [ { "identifier": "https://media.example.com/jane-400.jpg" } ]
                    },
                    {
                        "data": { "com.linkedin.digitalmedia.mediaartifact.StillImage": { "displaySize": { "width": 200.0, "height": 200.0 } } },
                        "identifiers": [ { "identifier": "https://media.example.com/jane-200.jpg" } ]
                    }
                ]
            }
        }
    })
}

#[tokio::test]
async fn test_userinfo_headline_used_when_legacy_forbidden() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(Some("Senior Software Engineer | Rust @ Acme"))),
        ..Default::default()
    })
    .await;
    let pool = memory_pool().await;
    let state = test_state(&fake.base_url, pool.clone());

    let outcome = state.pipeline.run(request("user-1"), metadata()).await.unwrap();
    let profile = &outcome.profile.profile;

    assert_eq!(profile.identity_id, "li-jane-001");
    assert_eq!(profile.headline, "Senior Software Engineer | Rust @ Acme");
    assert_eq!(profile.provenance.headline, Some(SourceId::UserInfo));
    assert_eq!(profile.email, "jane@example.com");
    assert_eq!(outcome.profile.role_level, RoleLevel::Senior);
    assert_eq!(outcome.profile.tags, vec!["Senior Software Engineer", "Rust", "Acme"]);

    // Every projection was tried once; 403 is not retried
    assert_eq!(fake.count(|h| &h.me), 3);
    // Email already known, headline already known
    assert_eq!(fake.count(|h| &h.email), 0);
    assert_eq!(fake.count(|h| &h.profile_page), 0);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].strategy, "legacy_profile");

    // Name-derived guess fills the missing profile URL
    assert_eq!(profile.profile_url, format!("{}/in/jane-doe", fake.base_url));
    assert!(profile.profile_url_guessed);
    assert_eq!(profile.provenance.profile_url, Some(SourceId::Constructed));

    let stored = get_profile_by_user(&pool, "user-1").await.unwrap().unwrap();
    assert_eq!(stored.id, outcome.import_id);
    assert_eq!(stored.profile.profile.headline, profile.headline);
    assert_eq!(stored.consent_ip_address, "203.0.113.7");
    assert_eq!(count_audit_entries(&pool, "user-1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_legacy_profile_outranks_userinfo() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(Some("Software Engineer"))),
        me: Reply::ok(legacy_profile("Staff Engineer at Acme")),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let outcome = state.pipeline.run(request("user-2"), metadata()).await.unwrap();
    let profile = &outcome.profile.profile;

    assert_eq!(profile.headline, "Staff Engineer at Acme");
    assert_eq!(profile.provenance.headline, Some(SourceId::LegacyApi));
    assert_eq!(profile.avatar_url, "https://media.example.com/jane-400.jpg");
    assert_eq!(profile.provenance.avatar_url, Some(SourceId::LegacyApi));
    assert_eq!(profile.profile_url, format!("{}/in/janedoe", fake.base_url));
    assert!(!profile.profile_url_guessed);
    assert!(outcome.failures.is_empty());

    // First projection succeeded
    assert_eq!(fake.count(|h| &h.me), 1);
}

#[tokio::test]
async fn test_missing_headline_stored_as_empty() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(json!({ "sub": "li-bare-002" })),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let outcome = state.pipeline.run(request("user-3"), metadata()).await.unwrap();
    let profile = &outcome.profile.profile;

    assert_eq!(profile.identity_id, "li-bare-002");
    assert_eq!(profile.headline, "");
    assert_eq!(profile.provenance.headline, None);
    assert_eq!(profile.profile_url, "");
    assert_eq!(outcome.profile.role_level, RoleLevel::Professional);
    assert!(outcome.profile.tags.is_empty());

    // No name means no guessed URL, no URL means no scrape
    assert_eq!(fake.count(|h| &h.profile_page), 0);
    assert_eq!(fake.count(|h| &h.email), 1);
}

#[tokio::test]
async fn test_scrape_fills_headline_from_constructed_url() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(None)),
        profile_page: Some(profile_page_html("Jane Doe", "Principal Engineer at Acme")),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let outcome = state.pipeline.run(request("user-4"), metadata()).await.unwrap();
    let profile = &outcome.profile.profile;

    assert_eq!(fake.page_paths(), vec!["jane-doe".to_string()]);
    assert_eq!(profile.headline, "Principal Engineer at Acme");
    assert_eq!(profile.provenance.headline, Some(SourceId::Scrape));
    assert_eq!(outcome.profile.role_level, RoleLevel::Senior);
}

#[tokio::test]
async fn test_scrape_failure_is_not_fatal() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(None)),
        profile_page: None,
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let outcome = state.pipeline.run(request("user-5"), metadata()).await.unwrap();

    assert_eq!(outcome.profile.profile.headline, "");
    // Scrape is a single attempt
    assert_eq!(fake.count(|h| &h.profile_page), 1);
    assert!(outcome.failures.iter().any(|f| f.strategy == "scrape" && f.status == Some(404)));
}

#[tokio::test]
async fn test_userinfo_404_uses_provider_endpoint() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::status(404),
        userinfo_fallback: Reply::ok(jane_claims(Some("Engineer"))),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let outcome = state.pipeline.run(request("user-6"), metadata()).await.unwrap();

    assert_eq!(fake.count(|h| &h.userinfo), 1);
    assert_eq!(fake.count(|h| &h.userinfo_fallback), 1);
    assert_eq!(outcome.profile.profile.identity_id, "li-jane-001");
    assert_eq!(outcome.profile.profile.provenance.identity_id, Some(SourceId::UserInfo));
}

#[tokio::test]
async fn test_token_rejection_is_terminal() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        token: Reply {
            status: 400,
            body: json!({ "error": "invalid_request", "error_description": "authorization code expired" }),
        },
        userinfo: Reply::ok(jane_claims(Some("Engineer"))),
        ..Default::default()
    })
    .await;
    let pool = memory_pool().await;
    let state = test_state(&fake.base_url, pool.clone());

    let err = state.pipeline.run(request("user-7"), metadata()).await.unwrap_err();

    match err {
        PipelineError::TokenExchangeFailed(upstream) => {
            assert_eq!(upstream.status, Some(400));
            assert!(upstream.body.contains("authorization code expired"));
        }
        other => panic!("expected token exchange failure, got {:?}", other),
    }

    assert_eq!(fake.count(|h| &h.token), 1);
    assert_eq!(fake.count(|h| &h.userinfo), 0);
    assert!(get_profile_by_user(&pool, "user-7").await.unwrap().is_none());
}

#[tokio::test]
async fn test_token_server_error_not_retried() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        token: Reply::status(503),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let err = state.pipeline.run(request("user-8"), metadata()).await.unwrap_err();

    assert!(matches!(err, PipelineError::TokenExchangeFailed(ref e) if e.status == Some(503)));
    assert_eq!(fake.count(|h| &h.token), 1);
}

#[tokio::test]
async fn test_token_request_carries_code_and_redirect() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(Some("Engineer"))),
        ..Default::default()
    })
    .await;
    let state = test_state(&fake.base_url, memory_pool().await);

    state.pipeline.run(request("user-9"), metadata()).await.unwrap();

    let forms = fake.token_forms();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0]["grant_type"], "authorization_code");
    assert_eq!(forms[0]["code"], "auth-code-123");
    assert_eq!(forms[0]["redirect_uri"], REDIRECT_URI);
    assert_eq!(forms[0]["client_id"], "test-client");
}

#[tokio::test]
async fn test_missing_identity_fails_merge() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::status(500),
        ..Default::default()
    })
    .await;
    let pool = memory_pool().await;
    let state = test_state(&fake.base_url, pool.clone());

    let err = state.pipeline.run(request("user-10"), metadata()).await.unwrap_err();

    match err {
        PipelineError::MergeIncomplete { failures, .. } => {
            let names: Vec<&str> = failures.iter().map(|f| f.strategy).collect();
            assert!(names.contains(&"userinfo"));
            assert!(names.contains(&"legacy_profile"));
        }
        other => panic!("expected merge incomplete, got {:?}", other),
    }

    // 5xx retried up to the two-attempt budget
    assert_eq!(fake.count(|h| &h.userinfo), 2);
    assert!(get_profile_by_user(&pool, "user-10").await.unwrap().is_none());
    assert_eq!(count_audit_entries(&pool, "user-10").await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_input_rejected_before_upstream() {
    let fake = spawn_fake_linkedin(FakeLinkedIn::default()).await;
    let state = test_state(&fake.base_url, memory_pool().await);

    let err = state
        .pipeline
        .run(
            ImportRequest {
                authorization_code: "  ".to_string(),
                user_id: "user-11".to_string(),
                redirect_uri: None,
            },
            metadata(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InputInvalid(_)));
    assert_eq!(fake.count(|h| &h.token), 0);
}

#[tokio::test]
async fn test_reimport_updates_same_record() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(Some("Engineer"))),
        ..Default::default()
    })
    .await;
    let pool = memory_pool().await;
    let state = test_state(&fake.base_url, pool.clone());

    let first = state.pipeline.run(request("user-12"), metadata()).await.unwrap();
    let second = state.pipeline.run(request("user-12"), metadata()).await.unwrap();

    assert_eq!(first.import_id, second.import_id);
    assert_eq!(count_audit_entries(&pool, "user-12").await.unwrap(), 2);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM linkedin_profiles")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

/// Stores profiles in SQLite but cannot write audit entries
struct AuditlessSink {
    inner: SqliteProfileSink,
    audit_attempts: AtomicUsize,
}

#[async_trait]
impl ProfileSink for AuditlessSink {
    async fn upsert_profile(
        &self,
        user_id: &str,
        profile: &EnrichedProfile,
        metadata: &RequestMetadata,
    ) -> lpi_common::Result<PersistedProfileRecord> {
        self.inner.upsert_profile(user_id, profile, metadata).await
    }

    async fn insert_audit(&self, _entry: &AuditEntry) -> lpi_common::Result<()> {
        self.audit_attempts.fetch_add(1, Ordering::SeqCst);
        Err(lpi_common::Error::Internal("audit table unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_audit_failure_keeps_stored_profile() {
    let fake = spawn_fake_linkedin(FakeLinkedIn {
        userinfo: Reply::ok(jane_claims(Some("Engineer"))),
        ..Default::default()
    })
    .await;
    let pool = memory_pool().await;
    let sink = Arc::new(AuditlessSink {
        inner: SqliteProfileSink::new(pool.clone()),
        audit_attempts: AtomicUsize::new(0),
    });
    let (pipeline, _scraper) = test_pipeline(&fake.base_url, sink.clone());

    let outcome = pipeline.run(request("user-13"), metadata()).await.unwrap();

    assert_eq!(sink.audit_attempts.load(Ordering::SeqCst), 1);
    let stored = get_profile_by_user(&pool, "user-13").await.unwrap().unwrap();
    assert_eq!(outcome.import_id, stored.id);
    assert_eq!(stored.profile.profile.identity_id, "li-jane-001");
    assert_eq!(count_audit_entries(&pool, "user-13").await.unwrap(), 0);
}
