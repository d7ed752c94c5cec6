//! Order aggregate and related types.

mod aggregate;
mod assembler;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderLine};
pub use assembler::{AssembledOrder, OrderAssembler, ReservedLine, order_total};
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{
    CustomerId, MINOR_UNIT_SCALE, Money, OrderId, OrderLineId, ProductId,
};
