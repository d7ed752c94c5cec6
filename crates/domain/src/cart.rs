//! The cart submitted at checkout and its validation rules.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::ProductId;

/// A raw cart line as submitted by the caller.
///
/// The quantity is signed so that malformed input reaches validation and is
/// reported as `InvalidQuantity` rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A transient cart plus shipping address. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub shipping_address: String,
}

/// A cart line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart that passed validation, lines in submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCart {
    items: Vec<CartItem>,
    shipping_address: String,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>, shipping_address: impl Into<String>) -> Self {
        Self {
            lines,
            shipping_address: shipping_address.into(),
        }
    }

    /// Checks the cart shape without touching storage.
    ///
    /// Emptiness is checked first, then every quantity, then the address.
    pub fn validate(&self) -> Result<ValidatedCart, DomainError> {
        if self.lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let items = self
            .lines
            .iter()
            .map(|line| {
                u32::try_from(line.quantity)
                    .ok()
                    .filter(|q| *q >= 1)
                    .map(|quantity| CartItem {
                        product_id: line.product_id.clone(),
                        quantity,
                    })
                    .ok_or_else(|| DomainError::InvalidQuantity {
                        product_id: line.product_id.clone(),
                        quantity: line.quantity,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let shipping_address = self.shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(DomainError::MissingShippingAddress);
        }

        Ok(ValidatedCart {
            items,
            shipping_address: shipping_address.to_string(),
        })
    }
}

impl ValidatedCart {
    /// Returns the items in submitted order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    /// Distinct product ids in canonical (sorted) order.
    ///
    /// Every checkout acquires product locks in this order so that two carts
    /// sharing products can never wait on each other in a cycle.
    pub fn lock_order(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Total units requested across all lines.
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}
