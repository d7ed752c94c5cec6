//! Order aggregate: the order record and its lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CustomerId, Money, OrderId, OrderLineId, OrderStatus, PaymentStatus, ProductId,
};

/// Order aggregate root as persisted by checkout.
///
/// `total_amount` is fixed when the order is assembled and never changes;
/// the two status fields belong to fulfillment and payment processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// One line of an order, carrying the unit price captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns the unrounded line subtotal (quantity * unit_price).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_line_subtotal() {
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id: OrderId::new(),
            product_id: ProductId::new("SKU-001"),
            quantity: 3,
            unit_price: Money::from_cents(1000),
        };
        assert_eq!(line.subtotal(), Money::from_cents(3000));
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = Order {
            id: OrderId::new(),
            customer_id: CustomerId::new(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: "1 Main St".to_string(),
            total_amount: Money::from_cents(2697),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
