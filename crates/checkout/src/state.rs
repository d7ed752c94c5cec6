//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The stage a single checkout call has reached.
///
/// State transitions:
/// ```text
/// Validating ──► Reserving ──► Assembling ──► Committing ──► Committed
///     │             ▲  │            │            │  │
///     │             └──┴──── retry ─┼────────────┘  │
///     └─────────────────────────────┴───────────────┴──► Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Checking the cart shape; no storage touched yet.
    #[default]
    Validating,

    /// Locking rows and decrementing stock inside the transaction.
    Reserving,

    /// Building the order from the reserved lines.
    Assembling,

    /// Writing the order and committing.
    Committing,

    /// The order is durable (terminal state).
    Committed,

    /// The call failed and nothing was written (terminal state).
    Aborted,
}

impl CheckoutState {
    /// Returns true if moving to `next` is a legal step.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Validating, Reserving)
                | (Reserving, Assembling)
                | (Reserving, Reserving)
                | (Assembling, Committing)
                | (Committing, Committed)
                | (Committing, Reserving)
                | (Validating | Reserving | Assembling | Committing, Aborted)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Validating => "Validating",
            CheckoutState::Reserving => "Reserving",
            CheckoutState::Assembling => "Assembling",
            CheckoutState::Committing => "Committing",
            CheckoutState::Committed => "Committed",
            CheckoutState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
