//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The phase a checkout attempt is in.
///
/// State transitions:
/// ```text
/// Idle ──► Validating ──┬──► Committing ──► Completed
///                       ├──► RejectedEmpty
///                       ├──► RejectedFunds
///                       └──► RejectedStock
/// ```
///
/// A rejection persists nothing; the cart is left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    #[default]
    Idle,

    /// Reading the cart, balance and stock.
    Validating,

    /// Writing the order, debit, stock changes and cart reset.
    Committing,

    /// The order is durable (terminal state).
    Completed,

    /// The cart had no lines (terminal state).
    RejectedEmpty,

    /// The balance did not cover the cart total (terminal state).
    RejectedFunds,

    /// A product could not cover its line (terminal state).
    RejectedStock,
}

impl CheckoutState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Completed
                | CheckoutState::RejectedEmpty
                | CheckoutState::RejectedFunds
                | CheckoutState::RejectedStock
        )
    }

    /// Returns true if the checkout ended without an order.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            CheckoutState::RejectedEmpty
                | CheckoutState::RejectedFunds
                | CheckoutState::RejectedStock
        )
    }

    /// Returns true if `next` may follow this state.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Committing)
                | (Validating, RejectedEmpty)
                | (Validating, RejectedFunds)
                | (Validating, RejectedStock)
                | (Committing, Completed)
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "Idle",
            CheckoutState::Validating => "Validating",
            CheckoutState::Committing => "Committing",
            CheckoutState::Completed => "Completed",
            CheckoutState::RejectedEmpty => "RejectedEmpty",
            CheckoutState::RejectedFunds => "RejectedFunds",
            CheckoutState::RejectedStock => "RejectedStock",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
