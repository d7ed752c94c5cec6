pub mod observability;
pub mod orders;
