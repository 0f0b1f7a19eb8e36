//! Profile import API handler
//!
//! POST /linkedin/import

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::types::{EnrichedProfile, RequestMetadata};
use crate::workflow::ImportRequest;
use crate::AppState;

/// POST /linkedin/import request
///
/// Fields default to empty so a missing value is reported as invalid input
/// rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportProfileRequest {
    pub authorization_code: String,
    pub user_id: String,
    pub redirect_uri: Option<String>,
}

/// POST /linkedin/import response
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportProfileResponse {
    pub success: bool,
    pub profile: EnrichedProfile,
    pub import_id: String,
}

/// POST /linkedin/import
pub async fn import_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ImportProfileRequest>, JsonRejection>,
) -> ApiResult<Json<ImportProfileResponse>> {
    let Json(request) = body.map_err(|e| ApiError::InputInvalid(e.body_text()))?;
    let metadata = request_metadata(&headers);

    let outcome = state
        .pipeline
        .run(
            ImportRequest {
                authorization_code: request.authorization_code,
                user_id: request.user_id,
                redirect_uri: request.redirect_uri,
            },
            metadata,
        )
        .await?;

    Ok(Json(ImportProfileResponse {
        success: true,
        profile: outcome.profile,
        import_id: outcome.import_id,
    }))
}

/// Caller user agent and client IP from request headers
///
/// The first `X-Forwarded-For` hop wins over `X-Real-IP`.
pub fn request_metadata(headers: &HeaderMap) -> RequestMetadata {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let client_ip = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str("x-real-ip"))
        .unwrap_or("unknown");

    RequestMetadata::new(user_agent, client_ip)
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new().route("/linkedin/import", post(import_profile))
}
