//! Line-item arithmetic for carts.
//!
//! These functions are pure; [`CartService`](super::CartService) loads the rows,
//! applies them and writes the result back inside one transaction.

use chrono::{DateTime, Utc};
use common::{CartId, LineItemId, Money};
use serde::{Deserialize, Serialize};
use store::{CartLineItem, Product};

use crate::error::DomainError;

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// What a cart mutation did to the product's line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CartOutcome {
    /// The line exists with a positive quantity.
    Added {
        product_title: String,
        quantity_delta: i32,
        current_quantity: u32,
    },

    /// The line no longer exists.
    Removed { product_title: String },
}

impl CartOutcome {
    /// Returns the outcome label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartOutcome::Added { .. } => "added",
            CartOutcome::Removed { .. } => "removed",
        }
    }
}

/// The write a mutation requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// Insert or overwrite the line.
    Upsert(CartLineItem),

    /// Delete the line if it exists.
    Remove,
}

/// Result of applying a delta to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUpdate {
    pub change: LineChange,
    pub outcome: CartOutcome,
}

/// Applies a signed quantity delta to the product's line.
///
/// A resulting quantity of zero or less removes the line. Otherwise the line
/// is repriced at the product's current unit price. An existing line keeps
/// its id and `added_at`. Quantities above [`MAX_LINE_QUANTITY`] and
/// subtotals that overflow are rejected with `OutOfRange`.
pub fn apply_delta(
    cart_id: CartId,
    existing: Option<&CartLineItem>,
    product: &Product,
    quantity_delta: i32,
    now: DateTime<Utc>,
) -> Result<LineUpdate, DomainError> {
    let current = existing.map_or(0, |line| i64::from(line.quantity));
    let new_quantity = current + i64::from(quantity_delta);

    if new_quantity <= 0 {
        return Ok(LineUpdate {
            change: LineChange::Remove,
            outcome: CartOutcome::Removed {
                product_title: product.title.clone(),
            },
        });
    }

    let quantity = u32::try_from(new_quantity)
        .ok()
        .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
        .ok_or_else(|| {
            DomainError::OutOfRange(format!(
                "{} quantity {new_quantity} exceeds {MAX_LINE_QUANTITY}",
                product.title
            ))
        })?;
    let subtotal = product.unit_price.checked_mul(quantity).ok_or_else(|| {
        DomainError::OutOfRange(format!(
            "{quantity} x {} {} is too large",
            product.unit_price, product.title
        ))
    })?;

    let line = CartLineItem {
        id: existing.map_or_else(LineItemId::new, |line| line.id),
        cart_id,
        product_id: product.id,
        quantity,
        unit_price: product.unit_price,
        subtotal,
        added_at: existing.map_or(now, |line| line.added_at),
    };

    Ok(LineUpdate {
        change: LineChange::Upsert(line),
        outcome: CartOutcome::Added {
            product_title: product.title.clone(),
            quantity_delta,
            current_quantity: quantity,
        },
    })
}

/// Sum of line subtotals.
pub fn cart_total(lines: &[CartLineItem]) -> Result<Money, DomainError> {
    Money::checked_sum(lines.iter().map(|line| line.subtotal))
        .ok_or_else(|| DomainError::OutOfRange("cart total is too large".to_string()))
}
