//! Shared integration test helpers
//!
//! - `FakeLinkedIn`: in-process axum server standing in for the LinkedIn hosts
//! - `test_pipeline`: import pipeline wired against the fake and any sink
//! - `test_state`: full `AppState` wired against the fake and an in-memory pool

#![allow(dead_code)]

use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lpi_ingest::db::{ProfileSink, SqliteProfileSink};
use lpi_ingest::extractors::default_strategies;
use lpi_ingest::linkedin::{ClientCredentials, LinkedInClient, LinkedInEndpoints};
use lpi_ingest::scraper::{PageScraper, ProfileScraper};
use lpi_ingest::utils::RetryPolicy;
use lpi_ingest::workflow::{ImportPipeline, ProfileSourceChain};
use lpi_ingest::AppState;

pub const ACCESS_TOKEN: &str = "fake-access-token";
pub const REDIRECT_URI: &str = "http://localhost:3000/auth/linkedin/callback";

/// Canned status + JSON body
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: json!({ "status": status, "message": "fake upstream error" }),
        }
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap();
        (status, Json(self.body)).into_response()
    }
}

/// Behavior of every fake LinkedIn endpoint
#[derive(Debug, Clone)]
pub struct FakeLinkedIn {
    pub token: Reply,
    pub userinfo: Reply,
    pub userinfo_fallback: Reply,
    pub me: Reply,
    pub email: Reply,
    /// HTML served for `/in/:slug`; 404 when `None`
    pub profile_page: Option<String>,
}

impl Default for FakeLinkedIn {
    fn default() -> Self {
        Self {
            token: Reply::ok(json!({ "access_token": ACCESS_TOKEN, "expires_in": 5184000 })),
            userinfo: Reply::status(404),
            userinfo_fallback: Reply::status(404),
            me: Reply::status(403),
            email: Reply::status(403),
            profile_page: None,
        }
    }
}

/// Request counters per endpoint
#[derive(Debug, Default)]
pub struct Hits {
    pub token: AtomicUsize,
    pub userinfo: AtomicUsize,
    pub userinfo_fallback: AtomicUsize,
    pub me: AtomicUsize,
    pub email: AtomicUsize,
    pub profile_page: AtomicUsize,
}

impl Hits {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct FakeState {
    config: FakeLinkedIn,
    hits: Hits,
    token_forms: Mutex<Vec<HashMap<String, String>>>,
    page_paths: Mutex<Vec<String>>,
}

/// Running fake server
pub struct FakeServer {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeServer {
    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }

    pub fn count(&self, pick: impl Fn(&Hits) -> &AtomicUsize) -> usize {
        Hits::get(pick(&self.state.hits))
    }

    /// Form bodies posted to the token endpoint
    pub fn token_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.token_forms.lock().unwrap().clone()
    }

    /// Vanity slugs requested from the public profile host
    pub fn page_paths(&self) -> Vec<String> {
        self.state.page_paths.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false)
}

fn guarded(headers: &HeaderMap, reply: &Reply) -> Response {
    if authorized(headers) {
        reply.clone().into_response()
    } else {
        Reply::status(401).into_response()
    }
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.hits.token.fetch_add(1, Ordering::SeqCst);
    state.token_forms.lock().unwrap().push(form);
    state.config.token.clone().into_response()
}

async fn userinfo(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.hits.userinfo.fetch_add(1, Ordering::SeqCst);
    guarded(&headers, &state.config.userinfo)
}

async fn userinfo_fallback(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.hits.userinfo_fallback.fetch_add(1, Ordering::SeqCst);
    guarded(&headers, &state.config.userinfo_fallback)
}

async fn me(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.hits.me.fetch_add(1, Ordering::SeqCst);
    guarded(&headers, &state.config.me)
}

async fn email(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.hits.email.fetch_add(1, Ordering::SeqCst);
    guarded(&headers, &state.config.email)
}

async fn profile_page(State(state): State<Arc<FakeState>>, Path(slug): Path<String>) -> Response {
    state.hits.profile_page.fetch_add(1, Ordering::SeqCst);
    state.page_paths.lock().unwrap().push(slug);

    match &state.config.profile_page {
        Some(html) => Html(html.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the fake on an ephemeral port
pub async fn spawn_fake_linkedin(config: FakeLinkedIn) -> FakeServer {
    let state = Arc::new(FakeState {
        config,
        hits: Hits::default(),
        token_forms: Mutex::new(Vec::new()),
        page_paths: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/oauth/v2/accessToken", post(token))
        .route("/v2/userinfo", get(userinfo))
        .route("/oauth/v2/userinfo", get(userinfo_fallback))
        .route("/v2/me", get(me))
        .route("/v2/emailAddress", get(email))
        .route("/in/:slug", get(profile_page))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeServer {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// In-memory database with the profile and audit tables
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    lpi_common::db::init_tables(&pool).await.unwrap();
    pool
}

/// Import pipeline against the fake, with a millisecond retry schedule
pub fn test_pipeline(base_url: &str, sink: Arc<dyn ProfileSink>) -> (ImportPipeline, Arc<dyn ProfileScraper>) {
    let timeout = Duration::from_secs(5);
    let client = Arc::new(
        LinkedInClient::new(
            LinkedInEndpoints::single_host(base_url),
            timeout,
            RetryPolicy::from_millis(2, &[5]).unwrap(),
        )
        .unwrap(),
    );
    let scraper: Arc<dyn ProfileScraper> = Arc::new(PageScraper::new(timeout).unwrap());

    let chain = ProfileSourceChain::new(default_strategies(Arc::clone(&client), Arc::clone(&scraper)));
    let pipeline = ImportPipeline::new(
        client,
        ClientCredentials {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
        },
        Some(REDIRECT_URI.to_string()),
        chain,
        sink,
    );

    (pipeline, scraper)
}

/// Full application state against the fake, storing into `pool`
pub fn test_state(base_url: &str, pool: SqlitePool) -> AppState {
    let (pipeline, scraper) = test_pipeline(base_url, Arc::new(SqliteProfileSink::new(pool.clone())));
    AppState::new(pool, Arc::new(pipeline), scraper)
}

/// UserInfo claims for Jane Doe; `headline` omitted when `None`
pub fn jane_claims(headline: Option<&str>) -> Value {
    let mut claims = json!({
        "sub": "li-jane-001",
        "name": "Jane Doe",
        "given_name": "Jane",
        "family_name": "Doe",
        "email": "jane@example.com",
        "email_verified": true,
        "picture": "https://media.example.com/jane-100.jpg",
        "locale": { "country": "US", "language": "en" }
    });
    if let Some(headline) = headline {
        claims["headline"] = json!(headline);
    }
    claims
}

/// Public profile page carrying a JSON-LD Person block
pub fn profile_page_html(name: &str, job_title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{name} - {job_title} | LinkedIn</title>
<script type="application/ld+json">{{"@context":"http://schema.org","@type":"Person","name":"{name}","jobTitle":"{job_title}"}}</script>
</head>
<body><main>profile</main></body>
</html>"#
    )
}
