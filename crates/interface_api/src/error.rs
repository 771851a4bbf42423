//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_billing::BillingError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An invoice line request broke a billing rule
    #[error("{message}")]
    Rejected { code: &'static str, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Rejected { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        if let Some(kind) = err.rejection_kind() {
            return ApiError::Rejected {
                code: kind.code(),
                message: err.to_string(),
            };
        }

        match err {
            e @ (BillingError::ProviderNotFound(_)
            | BillingError::BarrelNotFound(_)
            | BillingError::InvoiceNotFound(_)) => ApiError::NotFound(e.to_string()),
            BillingError::Validation(msg) => ApiError::Validation(msg),
            BillingError::Conflict(msg) => ApiError::Conflict(msg),
            BillingError::Store(e) if e.is_not_found() => ApiError::NotFound(e.to_string()),
            BillingError::Store(e) if e.is_transient() => {
                error!("Ledger store unavailable: {}", e);
                ApiError::Unavailable("ledger store unavailable".to_string())
            }
            other => {
                error!("Request failed: {}", other);
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}
