//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps store, provider and validation errors to HTTP status codes with a
//! `{ "error": "<message>" }` body. Fault detail is logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_client::ProviderError;
use depot_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed a domain rule, e.g. a non-archive file name (400).
    #[error("{0}")]
    Validation(String),

    /// Request could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Referenced resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid admin credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// A backing provider is not configured (503).
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Storage or provider fault (500). `message` is returned to the client,
    /// `detail` is only logged.
    #[error("{message}: {detail}")]
    Internal { message: String, detail: String },
}

impl AppError {
    /// Create a 503 Service Unavailable error.
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Create a 500 error with a public message and a logged cause.
    pub fn internal(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    /// Map a store error: validation stays 400, everything else is a fault
    /// reported with `public` as the client-facing message.
    pub fn from_store(err: StoreError, public: &str) -> Self {
        match err {
            StoreError::Validation(v) => Self::Validation(v.to_string()),
            other => Self::internal(public, other),
        }
    }

    /// Map a provider error: unknown accounts become 404, everything else
    /// is a fault reported with `public` as the client-facing message.
    pub fn from_provider(err: ProviderError, public: &str) -> Self {
        match err {
            ProviderError::UserNotFound(_) => Self::NotFound("User not found".into()),
            other => Self::internal(public, other),
        }
    }

    /// Return the HTTP status code and machine-readable error code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// The message placed in the response body.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if let Self::Internal { message, detail } = &self {
            tracing::error!(code, %message, %detail, "request failed");
        } else if status.is_client_error() {
            tracing::debug!(code, error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Convert core validation errors to API errors.
impl From<depot_core::ValidationError> for AppError {
    fn from(err: depot_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::service_unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::internal("x", "y"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_code().0, expected, "{err:?}");
        }
    }

    #[test]
    fn store_validation_maps_to_400() {
        let err = AppError::from_store(
            StoreError::Validation(depot_core::ValidationError::WrongExtension("notes.txt".into())),
            "Failed to upload file",
        );
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("Only ZIP files are allowed"));
    }

    #[test]
    fn store_fault_uses_public_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::from_store(
            StoreError::Io {
                op: "write artifact",
                path: "/srv/uploads/a.zip".into(),
                source: io,
            },
            "Failed to upload file",
        );
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to upload file");
    }

    #[test]
    fn provider_user_not_found_maps_to_404() {
        let err = AppError::from_provider(
            ProviderError::UserNotFound("ghost".into()),
            "Failed to archive user",
        );
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "User not found");
    }

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn into_response_validation_body() {
        let (status, body) = response_parts(AppError::Validation("No file provided".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No file provided");
    }

    #[tokio::test]
    async fn into_response_internal_hides_details() {
        let (status, body) =
            response_parts(AppError::internal("Failed to delete file", "disk on fire at /srv")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to delete file");
        assert!(!body.error.contains("/srv"));
    }
}
