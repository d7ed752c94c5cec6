//! Builds the order aggregate from lines already accepted by the inventory ledger.

use chrono::Utc;

use crate::error::DomainError;

use super::{
    CustomerId, Money, Order, OrderId, OrderLine, OrderLineId, OrderStatus, PaymentStatus,
    ProductId,
};

/// A cart line whose stock has been reserved, with the price read at reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ReservedLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }
}

/// An order together with its lines, ready to be written in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Sums unrounded line subtotals and rounds once to the minor unit.
pub fn order_total<'a>(lines: impl IntoIterator<Item = &'a ReservedLine>) -> Money {
    lines
        .into_iter()
        .map(|line| line.unit_price.multiply(line.quantity))
        .sum::<Money>()
        .round_to_minor_units()
}

/// Pure constructor for new orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderAssembler;

impl OrderAssembler {
    /// Assembles a pending order with one line per reserved line.
    ///
    /// Lines keep their submitted order. Returns `EmptyCart` when nothing was
    /// reserved.
    pub fn assemble(
        customer_id: CustomerId,
        shipping_address: &str,
        reserved: &[ReservedLine],
    ) -> Result<AssembledOrder, DomainError> {
        if reserved.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let order_id = OrderId::new();
        let lines = reserved
            .iter()
            .map(|r| OrderLine {
                id: OrderLineId::new(),
                order_id,
                product_id: r.product_id.clone(),
                quantity: r.quantity,
                unit_price: r.unit_price,
            })
            .collect();

        let order = Order {
            id: order_id,
            customer_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: shipping_address.to_string(),
            total_amount: order_total(reserved),
            created_at: Utc::now(),
        };

        Ok(AssembledOrder { order, lines })
    }
}
