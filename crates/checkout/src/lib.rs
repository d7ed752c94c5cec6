//! Checkout orchestration for the storefront.
//!
//! A checkout turns a validated cart into a persisted order in one store
//! transaction:
//! 1. Validate the cart (no storage access)
//! 2. Lock every product row in ascending id order
//! 3. Reserve stock line by line, capturing the current unit price
//! 4. Assemble the order and its lines
//! 5. Write the order, lines and stock decrements, then commit
//!
//! Any failure rolls the transaction back, so nothing partial is ever
//! visible. Transient store failures are retried with a fresh transaction.

pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod state;

pub use config::CheckoutConfig;
pub use error::{CheckoutError, ErrorKind, Result};
pub use ledger::InventoryLedger;
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt};
pub use state::CheckoutState;
