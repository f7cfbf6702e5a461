//! Cart service providing the cart operations over a [`Store`].

use chrono::{DateTime, Utc};
use common::{CartId, Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{AccountRepository, CartRepository, ProductRepository, Store, Transaction};

use crate::DEFAULT_MAX_ATTEMPTS;
use crate::catalog::{self, ProductRef};
use crate::error::DomainError;

use super::aggregate::{self, CartOutcome, LineChange};

/// Read-only projection of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub total_price: Money,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<CartLineView>,
}

/// A cart line with its product reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineView {
    pub product: ProductRef,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub added_at: DateTime<Utc>,
}

/// Service for mutating and reading carts.
///
/// Every mutation runs in its own transaction with the cart row locked, so
/// concurrent mutations of one cart apply one after the other.
#[derive(Clone)]
pub struct CartService<S: Store> {
    store: S,
    max_attempts: u32,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many times a mutation is attempted when it hits a conflict.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds a signed quantity of a product to the user's cart.
    ///
    /// The cart is created on first use. A negative delta removes units and
    /// drops the line once its quantity reaches zero. Stock is not checked.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity_delta: i32,
    ) -> Result<CartOutcome, DomainError> {
        let mut attempt = 1;
        loop {
            match self.try_add_item(user_id, product_id, quantity_delta).await {
                Err(e) if e.is_conflict() && attempt < self.max_attempts => {
                    tracing::warn!(attempt, error = %e, "cart mutation conflicted, retrying");
                    attempt += 1;
                }
                Ok(outcome) => {
                    metrics::counter!("cart_mutations_total", "outcome" => outcome.as_str())
                        .increment(1);
                    return Ok(outcome);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity_delta: i32,
    ) -> Result<CartOutcome, DomainError> {
        let mut tx = self.store.begin().await?;

        if tx.find_account(user_id).await?.is_none() {
            return Err(DomainError::not_found("account", user_id));
        }
        let product = tx
            .find_product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        let cart = tx.lock_or_create_cart(user_id).await?;
        let existing = tx.find_line_item(cart.id, product_id).await?;

        let update = aggregate::apply_delta(
            cart.id,
            existing.as_ref(),
            &product,
            quantity_delta,
            Utc::now(),
        )?;

        match &update.change {
            LineChange::Upsert(line) => tx.save_line_item(line).await?,
            LineChange::Remove if existing.is_some() => {
                tx.delete_line_item(cart.id, product_id).await?
            }
            LineChange::Remove => {}
        }

        let lines = tx.line_items(cart.id).await?;
        let total = aggregate::cart_total(&lines)?;
        tx.set_cart_total(cart.id, total).await?;
        tx.commit().await?;

        tracing::debug!(
            cart_id = %cart.id,
            %total,
            outcome = update.outcome.as_str(),
            "cart updated"
        );
        Ok(update.outcome)
    }

    /// Removes every line from the user's cart.
    ///
    /// A user without a cart is left as is.
    #[tracing::instrument(skip(self))]
    pub async fn empty_cart(&self, user_id: UserId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        let Some(cart) = tx.lock_cart(user_id).await? else {
            return Ok(());
        };

        let removed = tx.clear_line_items(cart.id).await?;
        tx.set_cart_total(cart.id, Money::zero()).await?;
        tx.commit().await?;

        metrics::counter!("cart_mutations_total", "outcome" => "emptied").increment(1);
        tracing::debug!(cart_id = %cart.id, removed, "cart emptied");
        Ok(())
    }

    /// Loads the user's cart with its lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, DomainError> {
        let mut tx = self.store.begin().await?;

        let cart = tx
            .find_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", user_id))?;
        let lines = tx.line_items(cart.id).await?;
        let mut refs = catalog::product_refs(&mut tx, lines.iter().map(|l| l.product_id)).await?;
        tx.rollback().await?;

        let lines = lines
            .into_iter()
            .map(|line| CartLineView {
                product: refs.remove(&line.product_id).unwrap_or_else(|| ProductRef {
                    id: line.product_id,
                    title: None,
                }),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
                added_at: line.added_at,
            })
            .collect();

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            total_price: cart.total_price,
            updated_at: cart.updated_at,
            lines,
        })
    }

    /// Returns how many units of the product are in the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn quantity_in_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<u32, DomainError> {
        let mut tx = self.store.begin().await?;

        let quantity = match tx.find_cart(user_id).await? {
            Some(cart) => tx
                .find_line_item(cart.id, product_id)
                .await?
                .map_or(0, |line| line.quantity),
            None => 0,
        };
        tx.rollback().await?;

        Ok(quantity)
    }
}
