use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, Money, OrderId, ProductId, StoreId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::records::{
    Account, CartLineItem, CartRecord, OrderLineItem, OrderRecord, Product, SaleRecord,
    Storefront,
};
use crate::store::{
    AccountRepository, CartRepository, OrderRepository, ProductRepository, Store,
    StorefrontRepository, Transaction,
};
use crate::{Result, StoreError};

/// Write operations at which a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    SaveLineItem,
    SetCartTotal,
    DebitBalance,
    InsertOrder,
    InsertOrderItems,
    DecrementStock,
    IncrementSold,
    ClearLineItems,
    Commit,
}

/// What an armed fault point fails with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fails with [`StoreError::Unavailable`].
    Unavailable,
    /// Fails with [`StoreError::ConcurrencyConflict`].
    Conflict,
}

#[derive(Debug, Default)]
struct FaultPlan {
    armed: HashMap<FaultPoint, (Fault, u32)>,
}

impl FaultPlan {
    fn trip(&mut self, point: FaultPoint) -> Option<Fault> {
        let (fault, remaining) = self.armed.get_mut(&point)?;
        let fault = *fault;
        *remaining -= 1;
        if *remaining == 0 {
            self.armed.remove(&point);
        }
        Some(fault)
    }
}

/// Rows a transaction may update in place.
#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    accounts: HashMap<UserId, Account>,
    storefronts: HashMap<StoreId, Storefront>,
    carts: HashMap<UserId, CartRecord>,
    line_items: Vec<CartLineItem>,
}

/// Committed state. Orders and their lines are append-only, so a
/// transaction stages new ones beside the history instead of copying it.
#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    orders: Vec<OrderRecord>,
    order_items: Vec<OrderLineItem>,
}

/// In-memory store implementation for testing and local runs.
///
/// Each transaction holds an exclusive lock on the whole store and works on a
/// private copy of the mutable tables; commit swaps the copy in and appends
/// the staged orders. Transactions are therefore fully serialized and an
/// uncommitted transaction leaves no trace.
///
/// The copy costs time linear in the catalog, accounts and open carts, but
/// not in order history.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<StdMutex<FaultPlan>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` calls reaching `point` fail with `fault`.
    pub fn inject_fault(&self, point: FaultPoint, fault: Fault, times: u32) {
        if times == 0 {
            return;
        }
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed
            .insert(point, (fault, times));
    }

    /// Disarms every injected fault.
    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed
            .clear();
    }

    pub async fn insert_account(&self, account: Account) {
        self.state
            .lock()
            .await
            .tables
            .accounts
            .insert(account.user_id, account);
    }

    pub async fn insert_storefront(&self, storefront: Storefront) {
        self.state
            .lock()
            .await
            .tables
            .storefronts
            .insert(storefront.id, storefront);
    }

    pub async fn insert_product(&self, product: Product) {
        self.state
            .lock()
            .await
            .tables
            .products
            .insert(product.id, product);
    }

    /// Removes a product from the catalog, leaving carts and history alone.
    pub async fn remove_product(&self, id: ProductId) {
        self.state.lock().await.tables.products.remove(&id);
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.tables.products.get(&id).cloned()
    }

    pub async fn account(&self, user_id: UserId) -> Option<Account> {
        self.state.lock().await.tables.accounts.get(&user_id).cloned()
    }

    pub async fn cart(&self, user_id: UserId) -> Option<CartRecord> {
        self.state.lock().await.tables.carts.get(&user_id).cloned()
    }

    /// Lines of the user's cart; empty if the user has no cart.
    pub async fn cart_lines(&self, user_id: UserId) -> Vec<CartLineItem> {
        let state = self.state.lock().await;
        let Some(cart) = state.tables.carts.get(&user_id) else {
            return Vec::new();
        };
        state
            .tables
            .line_items
            .iter()
            .filter(|item| item.cart_id == cart.id)
            .cloned()
            .collect()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of order lines stored.
    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.order_items.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.tables.clone();
        Ok(InMemoryTransaction {
            guard,
            working,
            new_orders: Vec::new(),
            new_order_items: Vec::new(),
            faults: self.faults.clone(),
        })
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: Tables,
    new_orders: Vec<OrderRecord>,
    new_order_items: Vec<OrderLineItem>,
    faults: Arc<StdMutex<FaultPlan>>,
}

impl InMemoryTransaction {
    fn trip(&self, point: FaultPoint) -> Result<()> {
        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .trip(point);

        match fault {
            None => Ok(()),
            Some(Fault::Unavailable) => Err(StoreError::Unavailable(format!(
                "injected fault at {point:?}"
            ))),
            Some(Fault::Conflict) => Err(StoreError::conflict(
                "injected",
                format!("injected conflict at {point:?}"),
            )),
        }
    }

    /// Committed orders followed by the ones staged in this transaction.
    fn orders(&self) -> impl DoubleEndedIterator<Item = &OrderRecord> {
        self.guard.orders.iter().chain(&self.new_orders)
    }

    fn order_lines(&self) -> impl Iterator<Item = &OrderLineItem> {
        self.guard.order_items.iter().chain(&self.new_order_items)
    }

    fn products_by_id(&self, ids: &[ProductId]) -> Vec<Product> {
        let wanted: BTreeSet<ProductId> = ids.iter().copied().collect();
        wanted
            .into_iter()
            .filter_map(|id| self.working.products.get(&id).cloned())
            .collect()
    }

    fn account_mut(&mut self, user_id: UserId) -> Result<&mut Account> {
        self.working
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::conflict("account", format!("{user_id} no longer exists")))
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.working
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::conflict("product", format!("{id} no longer exists")))
    }
}

#[async_trait]
impl ProductRepository for InMemoryTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn find_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(self.products_by_id(ids))
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        // The store-wide guard already excludes every other transaction.
        Ok(self.products_by_id(ids))
    }

    async fn products_for_store(&mut self, store_id: StoreId) -> Result<Vec<Product>> {
        Ok(self
            .working
            .products
            .values()
            .filter(|p| p.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32> {
        self.trip(FaultPoint::DecrementStock)?;
        let product = self.product_mut(id)?;
        if product.available_quantity < quantity {
            return Err(StoreError::conflict(
                "product",
                format!(
                    "{id} holds {} units, {quantity} requested",
                    product.available_quantity
                ),
            ));
        }
        product.available_quantity -= quantity;
        Ok(product.available_quantity)
    }

    async fn increment_sold(&mut self, id: ProductId) -> Result<()> {
        self.trip(FaultPoint::IncrementSold)?;
        let product = self.product_mut(id)?;
        product.sold += 1;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryTransaction {
    async fn find_account(&mut self, user_id: UserId) -> Result<Option<Account>> {
        Ok(self.working.accounts.get(&user_id).cloned())
    }

    async fn lock_account(&mut self, user_id: UserId) -> Result<Option<Account>> {
        Ok(self.working.accounts.get(&user_id).cloned())
    }

    async fn debit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money> {
        self.trip(FaultPoint::DebitBalance)?;
        let account = self.account_mut(user_id)?;
        let balance = account.balance.checked_sub(amount).ok_or_else(|| {
            StoreError::conflict(
                "account",
                format!("{user_id} balance {} cannot cover {amount}", account.balance),
            )
        })?;
        account.balance = balance;
        Ok(balance)
    }

    async fn credit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money> {
        let account = self.account_mut(user_id)?;
        account.balance = account.balance.checked_add(amount).ok_or_else(|| {
            StoreError::OutOfRange(format!(
                "{user_id} balance {} cannot take another {amount}",
                account.balance
            ))
        })?;
        Ok(account.balance)
    }

    async fn set_balance(&mut self, user_id: UserId, balance: Money) -> Result<()> {
        self.account_mut(user_id)?.balance = balance;
        Ok(())
    }
}

#[async_trait]
impl StorefrontRepository for InMemoryTransaction {
    async fn find_storefront(&mut self, id: StoreId) -> Result<Option<Storefront>> {
        Ok(self.working.storefronts.get(&id).cloned())
    }

    async fn find_storefront_by_owner(&mut self, owner_id: UserId) -> Result<Option<Storefront>> {
        Ok(self
            .working
            .storefronts
            .values()
            .find(|s| s.owner_id == owner_id)
            .cloned())
    }
}

#[async_trait]
impl CartRepository for InMemoryTransaction {
    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self.working.carts.get(&user_id).cloned())
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self.working.carts.get(&user_id).cloned())
    }

    async fn lock_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        Ok(self
            .working
            .carts
            .entry(user_id)
            .or_insert_with(|| CartRecord::new(user_id))
            .clone())
    }

    async fn line_items(&mut self, cart_id: CartId) -> Result<Vec<CartLineItem>> {
        Ok(self
            .working
            .line_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn find_line_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineItem>> {
        Ok(self
            .working
            .line_items
            .iter()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
            .cloned())
    }

    async fn save_line_item(&mut self, item: &CartLineItem) -> Result<()> {
        self.trip(FaultPoint::SaveLineItem)?;
        if item.quantity == 0 {
            return Err(StoreError::InvalidValue(format!(
                "line item {} must have a positive quantity",
                item.id
            )));
        }

        let existing = self
            .working
            .line_items
            .iter_mut()
            .find(|line| line.cart_id == item.cart_id && line.product_id == item.product_id);

        match existing {
            Some(line) => {
                line.quantity = item.quantity;
                line.unit_price = item.unit_price;
                line.subtotal = item.subtotal;
            }
            None => self.working.line_items.push(item.clone()),
        }
        Ok(())
    }

    async fn delete_line_item(&mut self, cart_id: CartId, product_id: ProductId) -> Result<()> {
        self.working
            .line_items
            .retain(|item| !(item.cart_id == cart_id && item.product_id == product_id));
        Ok(())
    }

    async fn clear_line_items(&mut self, cart_id: CartId) -> Result<u64> {
        self.trip(FaultPoint::ClearLineItems)?;
        let before = self.working.line_items.len();
        self.working
            .line_items
            .retain(|item| item.cart_id != cart_id);
        Ok((before - self.working.line_items.len()) as u64)
    }

    async fn set_cart_total(&mut self, cart_id: CartId, total: Money) -> Result<()> {
        self.trip(FaultPoint::SetCartTotal)?;
        let cart = self
            .working
            .carts
            .values_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or_else(|| StoreError::conflict("cart", format!("{cart_id} no longer exists")))?;
        cart.total_price = total;
        cart.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        self.trip(FaultPoint::InsertOrder)?;
        self.new_orders.push(order.clone());
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderLineItem]) -> Result<()> {
        self.trip(FaultPoint::InsertOrderItems)?;
        self.new_order_items.extend_from_slice(items);
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.orders().find(|order| order.id == id).cloned())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        // Reverse first so orders sharing a timestamp still come out newest first.
        let mut orders: Vec<_> = self
            .orders()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_items(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineItem>> {
        let mut items: Vec<_> = self
            .order_lines()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.order_id, item.line_number));
        Ok(items)
    }

    async fn sales_for_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<SaleRecord>> {
        let mut sales = Vec::new();
        for order in self.orders().rev() {
            let buyer_name = self
                .working
                .accounts
                .get(&order.user_id)
                .map(|account| account.name.clone())
                .unwrap_or_default();

            let mut lines: Vec<_> = self
                .order_lines()
                .filter(|item| item.order_id == order.id && product_ids.contains(&item.product_id))
                .collect();
            lines.sort_by_key(|item| item.line_number);

            sales.extend(lines.into_iter().map(|line| SaleRecord {
                line: line.clone(),
                buyer_name: buyer_name.clone(),
                ordered_at: order.created_at,
            }));
        }
        sales.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(sales)
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        self.trip(FaultPoint::Commit)?;
        let Self {
            mut guard,
            working,
            new_orders,
            new_order_items,
            ..
        } = self;
        guard.tables = working;
        guard.orders.extend(new_orders);
        guard.order_items.extend(new_order_items);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::LineItemId;

    fn line(cart_id: CartId, product_id: ProductId, quantity: u32, price: i64) -> CartLineItem {
        let unit_price = Money::from_cents(price);
        CartLineItem {
            id: LineItemId::new(),
            cart_id,
            product_id,
            quantity,
            unit_price,
            subtotal: unit_price.checked_mul(quantity).unwrap(),
            added_at: Utc::now(),
        }
    }

    async fn seeded() -> (InMemoryStore, Account, Product) {
        let store = InMemoryStore::new();
        let account = Account::new("Ana", Money::from_units(50));
        let storefront = Storefront::new(account.user_id, "Ana's");
        let product = Product::new(storefront.id, "Widget", Money::from_units(10), 5);
        store.insert_account(account.clone()).await;
        store.insert_storefront(storefront).await;
        store.insert_product(product.clone()).await;
        (store, account, product)
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let (store, account, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let balance = tx
            .debit_balance(account.user_id, Money::from_units(20))
            .await
            .unwrap();
        assert_eq!(balance, Money::from_units(30));
        tx.commit().await.unwrap();

        let stored = store.account(account.user_id).await.unwrap();
        assert_eq!(stored.balance, Money::from_units(30));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let (store, account, product) = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.debit_balance(account.user_id, Money::from_units(20))
                .await
                .unwrap();
            tx.decrement_stock(product.id, 2).await.unwrap();
        }

        assert_eq!(
            store.account(account.user_id).await.unwrap().balance,
            Money::from_units(50)
        );
        assert_eq!(store.product(product.id).await.unwrap().available_quantity, 5);
    }

    #[tokio::test]
    async fn explicit_rollback_discards_writes() {
        let (store, account, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        tx.lock_or_create_cart(account.user_id).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(store.cart(account.user_id).await.is_none());
    }

    #[tokio::test]
    async fn debit_refuses_to_go_negative() {
        let (store, account, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .debit_balance(account.user_id, Money::from_units(51))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { entity: "account", .. })
        ));
    }

    #[tokio::test]
    async fn decrement_refuses_to_go_negative() {
        let (store, _, product) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.decrement_stock(product.id, 5).await.unwrap(), 0);
        assert!(tx.decrement_stock(product.id, 1).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn credit_refuses_to_overflow() {
        let (store, account, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .credit_balance(account.user_id, Money::from_cents(i64::MAX))
            .await;
        assert!(matches!(result, Err(StoreError::OutOfRange(_))));
        drop(tx);

        assert_eq!(
            store.account(account.user_id).await.unwrap().balance,
            Money::from_units(50)
        );
    }

    #[tokio::test]
    async fn save_line_item_upserts_by_product() {
        let (store, account, product) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let cart = tx.lock_or_create_cart(account.user_id).await.unwrap();
        let first = line(cart.id, product.id, 2, 1000);
        tx.save_line_item(&first).await.unwrap();
        tx.save_line_item(&line(cart.id, product.id, 5, 1000))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let lines = store.cart_lines(account.user_id).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, first.id);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].subtotal, Money::from_units(50));
    }

    #[tokio::test]
    async fn save_line_item_rejects_zero_quantity() {
        let (store, account, product) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let cart = tx.lock_or_create_cart(account.user_id).await.unwrap();
        let result = tx.save_line_item(&line(cart.id, product.id, 0, 1000)).await;
        assert!(matches!(result, Err(StoreError::InvalidValue(_))));
    }

    #[tokio::test]
    async fn lock_or_create_cart_is_idempotent() {
        let (store, account, _) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let first = tx.lock_or_create_cart(account.user_id).await.unwrap();
        let second = tx.lock_or_create_cart(account.user_id).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn injected_fault_fires_requested_times() {
        let (store, account, _) = seeded().await;
        store.inject_fault(FaultPoint::DebitBalance, Fault::Unavailable, 1);

        let mut tx = store.begin().await.unwrap();
        let first = tx.debit_balance(account.user_id, Money::from_units(1)).await;
        assert!(matches!(first, Err(StoreError::Unavailable(_))));
        let second = tx.debit_balance(account.user_id, Money::from_units(1)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn commit_fault_keeps_previous_state() {
        let (store, account, _) = seeded().await;
        store.inject_fault(FaultPoint::Commit, Fault::Conflict, 1);

        let mut tx = store.begin().await.unwrap();
        tx.set_balance(account.user_id, Money::zero()).await.unwrap();
        assert!(tx.commit().await.unwrap_err().is_conflict());

        assert_eq!(
            store.account(account.user_id).await.unwrap().balance,
            Money::from_units(50)
        );
    }

    #[tokio::test]
    async fn orders_for_user_are_newest_first() {
        let (store, account, _) = seeded().await;
        let now = Utc::now();
        let older = OrderRecord {
            id: OrderId::new(),
            user_id: account.user_id,
            total_price: Money::from_units(1),
            created_at: now - Duration::minutes(5),
        };
        let newer = OrderRecord {
            id: OrderId::new(),
            created_at: now,
            ..older.clone()
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&older).await.unwrap();
        tx.insert_order(&newer).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let orders = tx.orders_for_user(account.user_id).await.unwrap();
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
    }

    #[tokio::test]
    async fn staged_orders_are_read_back_and_dropped_on_rollback() {
        let (store, account, product) = seeded().await;
        let kept = OrderRecord {
            id: OrderId::new(),
            user_id: account.user_id,
            total_price: Money::from_units(10),
            created_at: Utc::now(),
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&kept).await.unwrap();
        tx.commit().await.unwrap();

        let staged = OrderRecord {
            id: OrderId::new(),
            ..kept.clone()
        };
        let item = OrderLineItem {
            id: LineItemId::new(),
            order_id: staged.id,
            line_number: 1,
            product_id: product.id,
            quantity: 1,
            unit_price: product.unit_price,
            subtotal: product.unit_price,
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&staged).await.unwrap();
        tx.insert_order_items(std::slice::from_ref(&item)).await.unwrap();
        assert!(tx.find_order(kept.id).await.unwrap().is_some());
        assert!(tx.find_order(staged.id).await.unwrap().is_some());
        assert_eq!(tx.order_items(&[staged.id]).await.unwrap(), vec![item]);
        assert_eq!(tx.sales_for_products(&[product.id]).await.unwrap().len(), 1);
        tx.rollback().await.unwrap();

        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.order_item_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_transactions_serialize() {
        let (store, account, _) = seeded().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let current = tx.lock_account(account.user_id).await.unwrap().unwrap();
                tokio::task::yield_now().await;
                let balance = current.balance.checked_add(Money::from_units(1)).unwrap();
                tx.set_balance(account.user_id, balance).await.unwrap();
                tx.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            store.account(account.user_id).await.unwrap().balance,
            Money::from_units(60)
        );
    }
}
