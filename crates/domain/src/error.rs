//! Domain error types.

use std::fmt::Display;

use common::Money;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Checkout was attempted on a cart without line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The balance does not cover the cart total.
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Money, required: Money },

    /// One or more products cannot cover the requested quantity.
    #[error("Insufficient stock for: {}", .products.join(", "))]
    InsufficientStock { products: Vec<String> },

    /// The caller may not perform the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A concurrent writer won the race. Retrying may succeed.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Deposit below the accepted minimum.
    #[error("Deposit must be at least {minimum}")]
    InvalidDeposit { minimum: Money },

    /// A requested quantity or amount is larger than can be recorded.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// An infrastructure fault in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the operation may succeed in a fresh transaction.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConcurrencyConflict { .. } => {
                DomainError::ConcurrencyConflict(e.to_string())
            }
            StoreError::OutOfRange(detail) => DomainError::OutOfRange(detail),
            other => DomainError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_becomes_domain_conflict() {
        let err: DomainError = StoreError::conflict("account", "balance moved").into();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("balance moved"));
    }

    #[test]
    fn other_store_errors_are_wrapped() {
        let err: DomainError = StoreError::Unavailable("disk".into()).into();
        assert!(matches!(err, DomainError::Store(StoreError::Unavailable(_))));
        assert!(!err.is_conflict());
    }

    #[test]
    fn store_range_errors_are_callers_fault() {
        let err: DomainError = StoreError::OutOfRange("quantity exceeds limit".into()).into();
        assert!(matches!(
            err,
            DomainError::OutOfRange(ref detail) if detail == "quantity exceeds limit"
        ));
        assert!(!err.is_conflict());
    }

    #[test]
    fn stock_message_lists_products() {
        let err = DomainError::InsufficientStock {
            products: vec!["pen".into(), "ink".into()],
        };
        assert_eq!(err.to_string(), "Insufficient stock for: pen, ink");
    }
}
