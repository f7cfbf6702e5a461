//! Sales made by a storefront.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use domain::catalog::ProductRef;
use domain::{DomainError, access};
use serde::{Deserialize, Serialize};
use store::{
    OrderRepository, ProductRepository, SaleRecord, Store, StorefrontRepository, Transaction,
};

/// One sold order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleView {
    pub order_id: OrderId,
    pub line_number: u32,
    pub product: ProductRef,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub buyer_name: String,
    pub ordered_at: DateTime<Utc>,
}

impl SaleView {
    fn new(sale: SaleRecord, refs: &HashMap<ProductId, ProductRef>) -> Self {
        let line = sale.line;
        Self {
            order_id: line.order_id,
            line_number: line.line_number,
            product: refs.get(&line.product_id).cloned().unwrap_or(ProductRef {
                id: line.product_id,
                title: None,
            }),
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal,
            buyer_name: sale.buyer_name,
            ordered_at: sale.ordered_at,
        }
    }
}

/// Queries over what storefronts have sold.
#[derive(Clone)]
pub struct SalesHistory<S: Store> {
    store: S,
}

impl<S: Store> SalesHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns every sale of the store owned by `owner_id`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn store_sales(&self, owner_id: UserId) -> Result<Vec<SaleView>, DomainError> {
        let mut tx = self.store.begin().await?;

        let storefront = tx
            .find_storefront_by_owner(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("store", owner_id))?;
        let products = tx.products_for_store(storefront.id).await?;
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let sales = tx.sales_for_products(&ids).await?;
        tx.rollback().await?;

        let refs: HashMap<ProductId, ProductRef> =
            products.iter().map(|p| (p.id, ProductRef::from(p))).collect();
        tracing::debug!(store_id = %storefront.id, sales = sales.len(), "store sales loaded");

        Ok(sales
            .into_iter()
            .map(|sale| SaleView::new(sale, &refs))
            .collect())
    }

    /// Returns every sale of one product, newest first.
    ///
    /// Only the owner of the product's store or an admin may see them.
    #[tracing::instrument(skip(self))]
    pub async fn product_sales(
        &self,
        caller: UserId,
        product_id: ProductId,
    ) -> Result<Vec<SaleView>, DomainError> {
        let mut tx = self.store.begin().await?;

        let product = tx
            .find_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;
        let owner = tx
            .find_storefront(product.store_id)
            .await?
            .map(|storefront| storefront.owner_id);
        access::ensure_owner_or_admin(&mut tx, caller, owner, "these sales").await?;

        let sales = tx.sales_for_products(&[product_id]).await?;
        tx.rollback().await?;

        let refs = HashMap::from([(product.id, ProductRef::from(&product))]);
        Ok(sales
            .into_iter()
            .map(|sale| SaleView::new(sale, &refs))
            .collect())
    }
}
