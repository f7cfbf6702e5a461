//! Domain layer for the storefront backend.
//!
//! This crate provides the rules that sit on top of the store:
//! - Cart aggregate: signed quantity deltas and cached totals
//! - Inventory guard: stock sufficiency for a set of cart lines
//! - Ledger: balance checks, deposits and resets

pub mod access;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod ledger;

pub use cart::{CartLineView, CartOutcome, CartService, CartView};
pub use catalog::ProductRef;
pub use error::DomainError;
pub use inventory::check_availability;
pub use ledger::{Ledger, MIN_DEPOSIT};

/// Attempts made for an operation that keeps hitting concurrency conflicts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
