//! Read side of completed checkouts.
//!
//! - [`OrderHistory`]: a user's receipts, newest first
//! - [`SalesHistory`]: what a store's products sold, and to whom

pub mod orders;
pub mod sales;

pub use orders::{OrderHistory, OrderLineView, OrderView};
pub use sales::{SaleView, SalesHistory};
