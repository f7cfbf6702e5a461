//! Checkout coordinator turning a cart into an order.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use common::{LineItemId, Money, OrderId, ProductId, UserId};
use domain::catalog::ProductRef;
use domain::{DEFAULT_MAX_ATTEMPTS, DomainError, check_availability, ledger};
use history::OrderView;
use store::{
    AccountRepository, CartRepository, OrderLineItem, OrderRecord, OrderRepository,
    ProductRepository, Store, Transaction,
};

use crate::state::CheckoutState;

/// Runs checkouts against a [`Store`].
///
/// Validation and commit share one transaction. The account, the cart and
/// every product on it are row-locked before anything is checked, so the
/// checks still hold when the writes land. Any failure drops the
/// transaction and nothing is persisted.
#[derive(Clone)]
pub struct CheckoutCoordinator<S: Store> {
    store: S,
    max_attempts: u32,
}

impl<S: Store> CheckoutCoordinator<S> {
    /// Creates a new coordinator.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many times a checkout is attempted when it hits a conflict.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks out the user's cart and returns the new order.
    ///
    /// Debits the cart total, records the order with price snapshots,
    /// decrements stock, bumps each product's sold counter once and empties
    /// the cart, all in one transaction. Concurrency conflicts are retried.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<OrderView, DomainError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();

        let mut attempt = 1;
        let result = loop {
            match self.try_checkout(user_id).await {
                Err(e) if e.is_conflict() => {
                    metrics::counter!("checkout_conflicts_total").increment(1);
                    if attempt >= self.max_attempts {
                        break Err(e);
                    }
                    tracing::warn!(attempt, error = %e, "checkout conflicted, retrying");
                    attempt += 1;
                }
                other => break other,
            }
        };

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);

        match &result {
            Ok(order) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_price,
                    lines = order.lines.len(),
                    duration,
                    "checkout completed"
                );
            }
            Err(e) => {
                if let Some(reason) = rejection_reason(e) {
                    metrics::counter!("checkout_rejected_total", "reason" => reason).increment(1);
                }
                tracing::warn!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn try_checkout(&self, user_id: UserId) -> Result<OrderView, DomainError> {
        let mut state = CheckoutState::Idle;
        let mut tx = self.store.begin().await?;

        advance(&mut state, CheckoutState::Validating);
        let account = tx
            .lock_account(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", user_id))?;
        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("cart", user_id))?;

        let lines = tx.line_items(cart.id).await?;
        if lines.is_empty() {
            advance(&mut state, CheckoutState::RejectedEmpty);
            return Err(DomainError::EmptyCart);
        }

        if let Err(e) = ledger::debit(account.balance, cart.total_price) {
            advance(&mut state, CheckoutState::RejectedFunds);
            return Err(e);
        }

        let mut product_ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let products = tx.lock_products(&product_ids).await?;

        let short = check_availability(&lines, &products);
        if !short.is_empty() {
            advance(&mut state, CheckoutState::RejectedStock);
            return Err(DomainError::InsufficientStock { products: short });
        }

        advance(&mut state, CheckoutState::Committing);
        tx.debit_balance(user_id, cart.total_price).await?;

        let order = OrderRecord {
            id: OrderId::new(),
            user_id,
            total_price: cart.total_price,
            created_at: Utc::now(),
        };
        tx.insert_order(&order).await?;

        let items: Vec<OrderLineItem> = (1u32..)
            .zip(&lines)
            .map(|(line_number, line)| OrderLineItem {
                id: LineItemId::new(),
                order_id: order.id,
                line_number,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal,
            })
            .collect();
        tx.insert_order_items(&items).await?;

        for line in &lines {
            tx.decrement_stock(line.product_id, line.quantity).await?;
            tx.increment_sold(line.product_id).await?;
        }

        tx.clear_line_items(cart.id).await?;
        tx.set_cart_total(cart.id, Money::zero()).await?;
        tx.commit().await?;
        advance(&mut state, CheckoutState::Completed);

        let refs: HashMap<ProductId, ProductRef> =
            products.iter().map(|p| (p.id, ProductRef::from(p))).collect();
        Ok(OrderView::new(order, items, &refs))
    }
}

fn advance(state: &mut CheckoutState, next: CheckoutState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid checkout transition {state} -> {next}"
    );
    tracing::debug!(from = %state, to = %next, "checkout state");
    *state = next;
}

fn rejection_reason(error: &DomainError) -> Option<&'static str> {
    match error {
        DomainError::EmptyCart => Some("empty_cart"),
        DomainError::InsufficientFunds { .. } => Some("insufficient_funds"),
        DomainError::InsufficientStock { .. } => Some("insufficient_stock"),
        DomainError::NotFound { .. } => Some("not_found"),
        _ => None,
    }
}
