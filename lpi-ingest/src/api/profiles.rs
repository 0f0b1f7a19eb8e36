//! Stored profile lookup
//!
//! GET /linkedin/profile/:user_id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::{get_profile_by_user, PersistedProfileRecord};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /linkedin/profile/:user_id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PersistedProfileRecord>> {
    get_profile_by_user(&state.db, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No LinkedIn profile stored for user {}", user_id)))
}

/// Build profile lookup routes
pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/linkedin/profile/:user_id", get(get_profile))
}
