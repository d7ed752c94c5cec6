//! Caller identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! customer id in the `x-customer-id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::CustomerId;

use crate::error::ApiError;

pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// Extractor that requires an authenticated customer.
///
/// Rejects with 401 when the header is missing or not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct RequireCustomer(pub CustomerId);

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let uuid = uuid::Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Unauthorized)?;
        Ok(Self(CustomerId::from_uuid(uuid)))
    }
}
