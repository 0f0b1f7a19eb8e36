//! Scrape RPC handler
//!
//! POST /linkedin/scrape: `{ profileUrl }` → `{ success, data }`
//!
//! Only URLs on the configured public profile host are fetched.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::scraper::{is_allowed_profile_url, is_valid_profile_url, ScrapeRequest, ScrapeResponse};
use crate::AppState;

/// POST /linkedin/scrape
pub async fn scrape_profile(
    State(state): State<AppState>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> ApiResult<Json<ScrapeResponse>> {
    let Json(request) = body.map_err(|e| ApiError::InputInvalid(e.body_text()))?;
    let profile_url = request.profile_url.trim();

    if !is_valid_profile_url(profile_url) {
        return Err(ApiError::InputInvalid(format!(
            "profileUrl must be an absolute http(s) URL, got '{}'",
            profile_url
        )));
    }

    let www_base = &state.pipeline.endpoints().www_base;
    if !is_allowed_profile_url(profile_url, www_base) {
        tracing::warn!(profile_url, allowed = %www_base, "Scrape RPC refused off-site URL");
        return Err(ApiError::InputInvalid(format!(
            "profileUrl must point at {}, got '{}'",
            www_base, profile_url
        )));
    }

    let fragment = state.scraper.scrape(profile_url).await?;

    tracing::info!(
        profile_url,
        method = fragment.extraction_method.map(|m| m.as_str()).unwrap_or("none"),
        "Scrape RPC served"
    );

    Ok(Json(ScrapeResponse {
        success: true,
        data: Some(fragment),
        error: None,
    }))
}

/// Build scrape routes
pub fn scrape_routes() -> Router<AppState> {
    Router::new().route("/linkedin/scrape", post(scrape_profile))
}
