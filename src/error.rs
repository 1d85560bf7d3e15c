//! API Error Taxonomy
//!
//! Every internal failure is mapped to one of these kinds at the endpoint
//! boundary. Messages are redacted; stack traces and internal identifiers
//! never reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Client-visible request failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed request payload or parameters
    #[error("{0}")]
    Validation(String),

    /// A session was presented but could not be verified
    #[error("authentication required")]
    Auth,

    /// The owner's rolling-window quota is exhausted
    #[error("daily quota exceeded")]
    QuotaExceeded,

    /// The requested tool is not enabled in this deployment
    #[error("feature not enabled")]
    FeatureDisabled,

    /// Unknown tool or route
    #[error("not found")]
    NotFound,

    /// Store, upstream, or unexpected internal failure; the request is
    /// denied rather than allowed through
    #[error("internal error")]
    Server,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Stable machine-checkable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Auth => "auth_error",
            ApiError::QuotaExceeded | ApiError::FeatureDisabled => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::Server => "server_error",
        }
    }

    /// Distinguishing code within `forbidden`, so clients can render an
    /// upgrade prompt for quota exhaustion instead of a generic failure.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::QuotaExceeded => Some("quota_exceeded"),
            ApiError::FeatureDisabled => Some("feature_disabled"),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth => StatusCode::UNAUTHORIZED,
            ApiError::QuotaExceeded | ApiError::FeatureDisabled => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Some(code) = self.code() {
            error["code"] = code.into();
        }

        let body = json!({ "success": false, "error": error });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ApiError::validation("bad").kind(), "validation_error");
        assert_eq!(ApiError::Auth.kind(), "auth_error");
        assert_eq!(ApiError::QuotaExceeded.kind(), "forbidden");
        assert_eq!(ApiError::FeatureDisabled.kind(), "forbidden");
        assert_eq!(ApiError::NotFound.kind(), "not_found");
        assert_eq!(ApiError::Server.kind(), "server_error");
    }

    #[test]
    fn test_quota_code_is_distinct() {
        assert_eq!(ApiError::QuotaExceeded.code(), Some("quota_exceeded"));
        assert_eq!(ApiError::FeatureDisabled.code(), Some("feature_disabled"));
        assert_eq!(ApiError::Server.code(), None);
    }

    #[tokio::test]
    async fn test_quota_exceeded_envelope() {
        let (status, body) = body_json(ApiError::QuotaExceeded).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "forbidden");
        assert_eq!(body["error"]["code"], "quota_exceeded");
    }

    #[tokio::test]
    async fn test_server_error_is_redacted() {
        let (status, body) = body_json(ApiError::Server).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["kind"], "server_error");
        assert_eq!(body["error"]["message"], "internal error");
    }

    #[tokio::test]
    async fn test_validation_status() {
        let (status, body) = body_json(ApiError::validation("body must be a JSON object")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation_error");
    }
}
