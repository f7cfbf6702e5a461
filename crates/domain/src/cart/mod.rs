//! Cart aggregate and service.

mod aggregate;
mod service;

pub use aggregate::{
    CartOutcome, LineChange, LineUpdate, MAX_LINE_QUANTITY, apply_delta, cart_total,
};
pub use service::{CartLineView, CartService, CartView};
