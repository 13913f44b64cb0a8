//! Mapping of domain failures onto HTTP responses.
//!
//! 400 for malformed or invalid input, 404 for unknown leads and unmatched
//! locations, 500 for everything else.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domains::discovery::DiscoveryError;
use crate::domains::leads::{PatchError, RecordError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PatchError> for ApiError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::UnknownField(_) | PatchError::TypeMismatch { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            PatchError::NotFound(_) => ApiError::NotFound(e.to_string()),
            PatchError::Rejected { .. } | PatchError::Unavailable(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Invalid(_) => ApiError::BadRequest(e.to_string()),
            StoreError::Database(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Store(e) => e.into(),
            RecordError::Publish(e) => ApiError::Internal(format!("{:#}", e)),
        }
    }
}

impl From<DiscoveryError> for ApiError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::InvalidRadius(_) => ApiError::BadRequest(e.to_string()),
            DiscoveryError::GeocodeNotFound(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_patch_errors_map_to_status() {
        let unknown: ApiError = PatchError::UnknownField("nope".into()).into();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let mismatch: ApiError = PatchError::TypeMismatch {
            field: "rating".into(),
            expected: "number",
        }
        .into();
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = PatchError::NotFound(Uuid::new_v4()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let down: ApiError = PatchError::Unavailable("connection reset".into()).into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_geocode_miss_is_not_found() {
        let e: ApiError = DiscoveryError::InvalidRadius(0).into();
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);

        let e: ApiError = DiscoveryError::GeocodeNotFound("Atlantis".into()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ApiError = DiscoveryError::Status {
            status: "OVER_QUERY_LIMIT".into(),
            message: String::new(),
        }
        .into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
