//! Checkout orchestrator: the one transaction that turns a cart into an order.

use std::time::Instant;

use domain::{
    AssembledOrder, Cart, CartLine, CustomerId, Money, OrderAssembler, OrderId, ValidatedCart,
};
use serde::Serialize;
use store::{Store, Transaction};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::ledger::InventoryLedger;
use crate::state::CheckoutState;

/// What a committed checkout hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub total_amount: Money,
}

/// Drives checkouts against a store.
///
/// Each call runs Validating → Reserving → Assembling → Committing and ends
/// either Committed or Aborted. Reserving through Committing happen inside a
/// single store transaction; an abort rolls all of it back.
#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator<S: Store> {
    store: S,
    config: CheckoutConfig,
}

impl<S: Store> CheckoutOrchestrator<S> {
    /// Creates an orchestrator with the default retry policy.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CheckoutConfig::default())
    }

    pub fn with_config(store: S, config: CheckoutConfig) -> Self {
        Self { store, config }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Places an order for `customer_id` from the given cart lines.
    ///
    /// The caller is responsible for authenticating `customer_id`. Dropping
    /// the returned future before it resolves rolls back any work in flight.
    #[tracing::instrument(skip(self, shipping_address, lines), fields(customer_id = %customer_id, lines = lines.len()))]
    pub async fn checkout(
        &self,
        customer_id: CustomerId,
        shipping_address: &str,
        lines: &[CartLine],
    ) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let result = self.run(customer_id, shipping_address, lines).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_committed_total").increment(1);
                tracing::info!(
                    order_id = %receipt.order_id,
                    total_amount = %receipt.total_amount,
                    "checkout committed"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_aborted_total", "reason" => e.reason()).increment(1);
                tracing::warn!(reason = e.reason(), error = %e, "checkout aborted");
            }
        }

        result
    }

    async fn run(
        &self,
        customer_id: CustomerId,
        shipping_address: &str,
        lines: &[CartLine],
    ) -> Result<CheckoutReceipt> {
        let mut state = CheckoutState::Validating;

        let cart = match Cart::new(lines.to_vec(), shipping_address).validate() {
            Ok(cart) => cart,
            Err(e) => {
                advance(&mut state, CheckoutState::Aborted);
                return Err(e.into());
            }
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            advance(&mut state, CheckoutState::Reserving);

            match self.attempt(customer_id, &cart, &mut state).await {
                Ok(receipt) => {
                    advance(&mut state, CheckoutState::Committed);
                    metrics::counter!("checkout_units_committed_total")
                        .increment(cart.total_units());
                    return Ok(receipt);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    metrics::counter!("checkout_retries_total").increment(1);
                    tracing::warn!(attempt, error = %e, "transient checkout failure, retrying");
                    tokio::time::sleep(self.config.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    advance(&mut state, CheckoutState::Aborted);
                    return Err(e);
                }
            }
        }
    }

    /// One pass over a fresh transaction.
    ///
    /// On failure `state` is left where the pass stopped; the caller decides
    /// between retrying and aborting.
    async fn attempt(
        &self,
        customer_id: CustomerId,
        cart: &ValidatedCart,
        state: &mut CheckoutState,
    ) -> Result<CheckoutReceipt> {
        let mut tx = self.store.begin().await?;

        let assembled = match reserve_and_write(tx.as_mut(), customer_id, cart, state).await {
            Ok(assembled) => assembled,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };

        tx.commit().await?;

        Ok(CheckoutReceipt {
            order_id: assembled.order.id,
            total_amount: assembled.order.total_amount,
        })
    }
}

/// Reserves every line, assembles the order and writes it through `tx`.
async fn reserve_and_write<T: Transaction + ?Sized>(
    tx: &mut T,
    customer_id: CustomerId,
    cart: &ValidatedCart,
    state: &mut CheckoutState,
) -> Result<AssembledOrder> {
    let mut ledger = InventoryLedger::new(&mut *tx);
    ledger.lock(&cart.lock_order()).await?;

    let mut reserved = Vec::with_capacity(cart.items().len());
    for item in cart.items() {
        reserved.push(ledger.reserve(&item.product_id, item.quantity).await?);
    }

    advance(state, CheckoutState::Assembling);
    let assembled = OrderAssembler::assemble(customer_id, cart.shipping_address(), &reserved)
        .map_err(CheckoutError::from)?;

    advance(state, CheckoutState::Committing);
    tx.insert_order(&assembled.order).await?;
    tx.insert_order_lines(&assembled.lines).await?;

    Ok(assembled)
}

fn advance(state: &mut CheckoutState, next: CheckoutState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal checkout transition {state} -> {next}"
    );
    tracing::debug!(from = %state, to = %next, "checkout state");
    *state = next;
}
