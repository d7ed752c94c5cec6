//! Domain layer for the storefront checkout.
//!
//! This crate provides the record types shared by every other crate:
//! - Product catalog entries with their stock and price
//! - The transient cart submitted at checkout and its validation rules
//! - Order and order-line records with the lifecycle/payment state machines
//! - The order assembler that turns reserved lines into an order aggregate

pub mod cart;
pub mod error;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartLine, ValidatedCart};
pub use error::DomainError;
pub use order::{
    AssembledOrder, CustomerId, Money, Order, OrderAssembler, OrderId, OrderLine, OrderLineId,
    OrderStatus, PaymentStatus, ProductId, ReservedLine,
};
pub use product::{CategoryId, Product};
