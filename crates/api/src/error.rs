//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, ErrorKind};
use store::StoreError;
use thiserror::Error;

/// Seconds a client should wait before resubmitting after a transient failure.
const RETRY_AFTER_SECS: &str = "1";

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No authenticated customer on the request.
    #[error("Authentication required")]
    Unauthorized,

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// Checkout failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => error_body(
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store read failed");
                if err.is_transient() {
                    unavailable()
                } else {
                    internal()
                }
            }
        }
    }
}

fn checkout_error_to_response(err: CheckoutError) -> Response {
    match (&err, err.kind()) {
        (
            CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            _,
        ) => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "productId": product_id,
                "requested": requested,
                "available": available,
            });
            (StatusCode::CONFLICT, Json(body)).into_response()
        }
        (CheckoutError::ProductNotFound(product_id), _) => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "productId": product_id,
            });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        (_, ErrorKind::Validation) => error_body(StatusCode::BAD_REQUEST, err.to_string()),
        (_, ErrorKind::BusinessRule) => error_body(StatusCode::CONFLICT, err.to_string()),
        (_, ErrorKind::Transient) => {
            tracing::warn!(error = %err, "checkout failed transiently");
            unavailable()
        }
        (_, ErrorKind::Storage) => {
            tracing::error!(error = %err, "checkout storage failure");
            internal()
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
        Json(serde_json::json!({ "error": "Temporarily unavailable, please retry" })),
    )
        .into_response()
}

// Storage details stay in the logs.
fn internal() -> Response {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
