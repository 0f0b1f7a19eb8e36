//! Error types for lpi-ingest
//!
//! `ApiError` is the HTTP face of every failure. Its status mirrors the stage
//! that failed; the body is always `{ error, detail, status }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::linkedin::UpstreamError;
use crate::utils::FailureClass;
use crate::workflow::PipelineError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request input (400)
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// LinkedIn rejected the request (original 4xx preserved)
    #[error("Upstream rejected request ({status}): {detail}")]
    UpstreamRejected { status: u16, detail: String },

    /// LinkedIn rate limit outlasted the retry budget (429)
    #[error("Upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    /// LinkedIn failed or was unreachable (original 5xx, 503 on network failure)
    #[error("Upstream unavailable ({status}): {detail}")]
    UpstreamUnavailable { status: u16, detail: String },

    /// No source resolved the member's identity (502)
    #[error("Profile incomplete: {0}")]
    MergeIncomplete(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InputInvalid(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ApiError::UpstreamRateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
            }
            ApiError::MergeIncomplete(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InputInvalid(_) => "input_invalid",
            ApiError::UpstreamRejected { .. } => "upstream_rejected",
            ApiError::UpstreamRateLimited(_) => "upstream_rate_limited",
            ApiError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ApiError::MergeIncomplete(_) => "merge_incomplete",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::InputInvalid(detail)
            | ApiError::UpstreamRateLimited(detail)
            | ApiError::MergeIncomplete(detail)
            | ApiError::NotFound(detail)
            | ApiError::Internal(detail)
            | ApiError::UpstreamRejected { detail, .. }
            | ApiError::UpstreamUnavailable { detail, .. } => detail.clone(),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let detail = err.to_string();

        match (err.class, err.status) {
            (FailureClass::RateLimited, _) => ApiError::UpstreamRateLimited(detail),
            (_, Some(status)) if (400..500).contains(&status) => {
                ApiError::UpstreamRejected { status, detail }
            }
            (_, Some(status)) if (500..600).contains(&status) => {
                ApiError::UpstreamUnavailable { status, detail }
            }
            // Unparseable success body
            (FailureClass::Permanent, _) => ApiError::UpstreamUnavailable { status: 502, detail },
            // Network failure or nonstandard status
            _ => ApiError::UpstreamUnavailable { status: 503, detail },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InputInvalid(detail) => ApiError::InputInvalid(detail),
            PipelineError::TokenExchangeFailed(upstream) => upstream.into(),
            PipelineError::SourcesFailed {
                class, status, detail, ..
            } => match (class, status) {
                (FailureClass::RateLimited, _) => ApiError::UpstreamRateLimited(detail),
                (FailureClass::Permanent, Some(status)) => ApiError::UpstreamRejected { status, detail },
                (_, Some(status)) if (500..600).contains(&status) => {
                    ApiError::UpstreamUnavailable { status, detail }
                }
                _ => ApiError::UpstreamUnavailable { status: 503, detail },
            },
            PipelineError::MergeIncomplete { detail, .. } => ApiError::MergeIncomplete(detail),
            PipelineError::Storage(e) => e.into(),
        }
    }
}

impl From<lpi_common::Error> for ApiError {
    fn from(err: lpi_common::Error) -> Self {
        match err {
            lpi_common::Error::NotFound(detail) => ApiError::NotFound(detail),
            lpi_common::Error::InvalidInput(detail) => ApiError::InputInvalid(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.kind(),
            "detail": self.detail(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_is_preserved() {
        let rejected: ApiError = UpstreamError::from_status("token_exchange", 401, "invalid").into();
        assert_eq!(rejected.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(rejected.kind(), "upstream_rejected");

        let unavailable: ApiError = UpstreamError::from_status("token_exchange", 504, "").into();
        assert_eq!(unavailable.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let limited: ApiError = UpstreamError::from_status("token_exchange", 429, "").into();
        assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_unparseable_body_is_bad_gateway() {
        let err: ApiError = UpstreamError::parse("token_exchange", "not json").into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_pipeline_errors_map_to_status() {
        let err: ApiError = PipelineError::InputInvalid("user_id is required".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = PipelineError::MergeIncomplete {
            detail: "no id".to_string(),
            failures: Vec::new(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "merge_incomplete");

        let err: ApiError = PipelineError::Storage(lpi_common::Error::Internal("disk".to_string())).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn sources_failed(class: FailureClass, status: Option<u16>) -> ApiError {
        PipelineError::SourcesFailed {
            class,
            status,
            detail: "all sources failed".to_string(),
            failures: Vec::new(),
        }
        .into()
    }

    #[test]
    fn test_uniform_source_failures_keep_upstream_class() {
        let err = sources_failed(FailureClass::RateLimited, Some(429));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.kind(), "upstream_rate_limited");

        let err = sources_failed(FailureClass::Permanent, Some(403));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.kind(), "upstream_rejected");

        let err = sources_failed(FailureClass::Transient, Some(502));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "upstream_unavailable");

        // Network failure or 408 timeout
        assert_eq!(
            sources_failed(FailureClass::Transient, None).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            sources_failed(FailureClass::Transient, Some(408)).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
