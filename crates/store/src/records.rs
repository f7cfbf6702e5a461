//! Persisted row shapes.
//!
//! These are plain data carriers; the invariants on them are enforced by the
//! domain services and by the constraints in the migrations.

use chrono::{DateTime, Utc};
use common::{CartId, LineItemId, Money, OrderId, ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

/// A catalog product with its stock counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub title: String,
    pub unit_price: Money,
    pub available_quantity: u32,
    /// Number of checkouts that included this product.
    pub sold: u32,
}

impl Product {
    pub fn new(
        store_id: StoreId,
        title: impl Into<String>,
        unit_price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            store_id,
            title: title.into(),
            unit_price,
            available_quantity,
            sold: 0,
        }
    }
}

/// Balance view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub name: String,
    pub is_admin: bool,
    pub balance: Money,
}

impl Account {
    pub fn new(name: impl Into<String>, balance: Money) -> Self {
        Self {
            user_id: UserId::new(),
            name: name.into(),
            is_admin: false,
            balance,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(name, Money::zero())
        }
    }
}

/// A seller. Only ownership is needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storefront {
    pub id: StoreId,
    pub owner_id: UserId,
    pub name: String,
}

impl Storefront {
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: StoreId::new(),
            owner_id,
            name: name.into(),
        }
    }
}

/// Cart header row. `total_price` caches the sum of the line subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub user_id: UserId,
    pub total_price: Money,
    pub updated_at: DateTime<Utc>,
}

impl CartRecord {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            total_price: Money::zero(),
            updated_at: Utc::now(),
        }
    }
}

/// A product line in a cart. Persisted lines always have `quantity > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: LineItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured at the last mutation of this line.
    pub unit_price: Money,
    pub subtotal: Money,
    pub added_at: DateTime<Utc>,
}

/// An immutable receipt header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

/// An immutable receipt line, priced as it was at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    /// 1-based position within the order.
    pub line_number: u32,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// An order line joined with who bought it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub line: OrderLineItem,
    pub buyer_name: String,
    pub ordered_at: DateTime<Utc>,
}
