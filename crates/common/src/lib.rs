//! Shared types for the storefront backend.
//!
//! Every crate in the workspace speaks in terms of these identifiers and
//! the [`Money`] value type, so they live at the bottom of the dependency graph.

pub mod ids;
pub mod money;

pub use ids::{CartId, LineItemId, OrderId, ProductId, StoreId, UserId};
pub use money::Money;
