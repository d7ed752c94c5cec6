//! Domain error types.

use thiserror::Error;

use crate::order::ProductId;

/// Errors raised by domain validation and state machines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line asks for fewer than one unit.
    #[error("Invalid quantity {quantity} for product {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// The shipping address is blank.
    #[error("Shipping address is required")]
    MissingShippingAddress,

    /// A lifecycle or payment status change that the state machine forbids.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: &'static str, to: &'static str },

    /// A persisted status string that matches no known variant.
    #[error("Unknown {kind} value: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}
