//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carries no usable caller identity.
    #[error("{0}")]
    Unauthenticated(String),

    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    match err {
        DomainError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": message }),
        ),
        DomainError::InsufficientStock { products } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": message, "products": products }),
        ),
        DomainError::EmptyCart
        | DomainError::InsufficientFunds { .. }
        | DomainError::InvalidDeposit { .. }
        | DomainError::OutOfRange(_) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": message }),
        ),
        DomainError::Unauthorized(_) => {
            (StatusCode::FORBIDDEN, serde_json::json!({ "error": message }))
        }
        DomainError::ConcurrencyConflict(_) => {
            (StatusCode::CONFLICT, serde_json::json!({ "error": message }))
        }
        DomainError::Store(_) => {
            tracing::error!(error = %message, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "internal server error" }),
            )
        }
    }
}
