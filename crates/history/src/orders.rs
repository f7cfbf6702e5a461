//! Order history: immutable receipts with their lines.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use domain::catalog::{self, ProductRef};
use domain::{DomainError, access};
use serde::{Deserialize, Serialize};
use store::{OrderLineItem, OrderRecord, OrderRepository, Store, Transaction};

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

/// A receipt line, priced as it was at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub line_number: u32,
    pub product: ProductRef,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl OrderView {
    /// Builds the view from an order and its lines.
    ///
    /// Lines are sorted by line number. Products missing from `refs` get a
    /// reference without a title.
    pub fn new(
        order: OrderRecord,
        mut items: Vec<OrderLineItem>,
        refs: &HashMap<ProductId, ProductRef>,
    ) -> Self {
        items.sort_by_key(|item| item.line_number);

        let lines = items
            .into_iter()
            .map(|item| OrderLineView {
                line_number: item.line_number,
                product: refs.get(&item.product_id).cloned().unwrap_or(ProductRef {
                    id: item.product_id,
                    title: None,
                }),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
            })
            .collect();

        Self {
            id: order.id,
            user_id: order.user_id,
            total_price: order.total_price,
            created_at: order.created_at,
            lines,
        }
    }
}

/// Queries over completed orders.
#[derive(Clone)]
pub struct OrderHistory<S: Store> {
    store: S,
}

impl<S: Store> OrderHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>, DomainError> {
        let mut tx = self.store.begin().await?;

        let orders = tx.orders_for_user(user_id).await?;
        let views = assemble(&mut tx, orders).await?;
        tx.rollback().await?;

        Ok(views)
    }

    /// Returns one order if the caller owns it or is an admin.
    #[tracing::instrument(skip(self))]
    pub async fn get_one(
        &self,
        caller: UserId,
        order_id: OrderId,
    ) -> Result<OrderView, DomainError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .find_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;
        access::ensure_owner_or_admin(&mut tx, caller, Some(order.user_id), "this order")
            .await?;

        let mut views = assemble(&mut tx, vec![order]).await?;
        tx.rollback().await?;

        views
            .pop()
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }
}

/// Loads lines and product references for the orders, keeping their order.
async fn assemble<T: Transaction>(
    tx: &mut T,
    orders: Vec<OrderRecord>,
) -> Result<Vec<OrderView>, DomainError> {
    let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
    let items = tx.order_items(&ids).await?;
    let refs = catalog::product_refs(tx, items.iter().map(|i| i.product_id)).await?;

    let mut by_order: HashMap<OrderId, Vec<OrderLineItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderView::new(order, items, &refs)
        })
        .collect())
}
