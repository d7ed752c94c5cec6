//! Checkout error types.

use domain::{DomainError, ProductId};
use store::StoreError;
use thiserror::Error;

/// Broad classes of checkout failure, used to pick a caller response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is malformed; resubmitting it unchanged fails again.
    Validation,
    /// The request is well formed but the catalog cannot satisfy it.
    BusinessRule,
    /// Infrastructure trouble that already survived one retry.
    Transient,
    /// The store failed in a way retrying will not fix.
    Storage,
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("Shipping address is required")]
    MissingShippingAddress,

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough stock for one line; `available` is the stock read under lock.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A domain rule outside cart validation was violated.
    #[error("Domain error: {0}")]
    Domain(DomainError),

    /// The store failed transiently (lock timeout, conflict, commit failure).
    #[error("Temporary store failure: {0}")]
    Transient(#[source] StoreError),

    /// The store failed permanently.
    #[error("Store error: {0}")]
    Storage(#[source] StoreError),
}

impl CheckoutError {
    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::EmptyCart
            | CheckoutError::InvalidQuantity { .. }
            | CheckoutError::MissingShippingAddress
            | CheckoutError::Domain(_) => ErrorKind::Validation,
            CheckoutError::ProductNotFound(_) | CheckoutError::InsufficientStock { .. } => {
                ErrorKind::BusinessRule
            }
            CheckoutError::Transient(_) => ErrorKind::Transient,
            CheckoutError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns true if a fresh transaction may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Transient(_))
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::InvalidQuantity { .. } => "invalid_quantity",
            CheckoutError::MissingShippingAddress => "missing_shipping_address",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::Domain(_) => "domain",
            CheckoutError::Transient(_) => "transient",
            CheckoutError::Storage(_) => "storage",
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EmptyCart => CheckoutError::EmptyCart,
            DomainError::InvalidQuantity {
                product_id,
                quantity,
            } => CheckoutError::InvalidQuantity {
                product_id,
                quantity,
            },
            DomainError::MissingShippingAddress => CheckoutError::MissingShippingAddress,
            other => CheckoutError::Domain(other),
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            CheckoutError::Transient(err)
        } else {
            CheckoutError::Storage(err)
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_domain_validation_errors_map_one_to_one() {
        assert!(matches!(
            CheckoutError::from(DomainError::EmptyCart),
            CheckoutError::EmptyCart
        ));
        assert!(matches!(
            CheckoutError::from(DomainError::MissingShippingAddress),
            CheckoutError::MissingShippingAddress
        ));

        let err = CheckoutError::from(DomainError::InvalidQuantity {
            product_id: ProductId::new("a"),
            quantity: -1,
        });
        match err {
            CheckoutError::InvalidQuantity {
                product_id,
                quantity,
            } => {
                assert_eq!(product_id, ProductId::new("a"));
                assert_eq!(quantity, -1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_store_errors_split_by_transience() {
        let lock = CheckoutError::from(StoreError::LockTimeout(Duration::from_millis(10)));
        assert_eq!(lock.kind(), ErrorKind::Transient);
        assert!(lock.is_retryable());

        let integrity = CheckoutError::from(StoreError::Integrity("fk".to_string()));
        assert_eq!(integrity.kind(), ErrorKind::Storage);
        assert!(!integrity.is_retryable());

        let unknown = CheckoutError::from(StoreError::CommitUnknown("reset".to_string()));
        assert_eq!(unknown.kind(), ErrorKind::Storage);
        assert!(!unknown.is_retryable());
    }

    #[test]
    fn test_business_rule_errors_are_not_retryable() {
        let err = CheckoutError::InsufficientStock {
            product_id: ProductId::new("a"),
            requested: 100,
            available: 50,
        };
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(!err.is_retryable());
        assert_eq!(err.reason(), "insufficient_stock");
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product a: requested 100, available 50"
        );
    }
}
