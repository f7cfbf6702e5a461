//! Checkout of a user's cart into an immutable order.
//!
//! The coordinator validates the cart against the user's balance and the
//! products' stock, then commits every effect of the purchase atomically:
//! 1. Debit the balance by the cart total
//! 2. Record the order and its lines
//! 3. Decrement stock and bump sold counters
//! 4. Empty the cart

pub mod coordinator;
pub mod state;

pub use coordinator::CheckoutCoordinator;
pub use state::CheckoutState;
