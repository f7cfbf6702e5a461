use async_trait::async_trait;
use common::{CartId, Money, OrderId, ProductId, StoreId, UserId};

use crate::Result;
use crate::records::{
    Account, CartLineItem, CartRecord, OrderLineItem, OrderRecord, Product, SaleRecord,
    Storefront,
};

/// Catalog reads and the stock counters the checkout mutates.
#[async_trait]
pub trait ProductRepository: Send {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Reads several products without locking. Missing ids are skipped.
    async fn find_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Reads and row-locks several products, ordered by id.
    ///
    /// Locking in id order keeps concurrent checkouts over overlapping
    /// products from deadlocking.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn products_for_store(&mut self, store_id: StoreId) -> Result<Vec<Product>>;

    /// Decrements stock, failing with `ConcurrencyConflict` if the row no
    /// longer holds `quantity` units. Returns the remaining stock.
    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32>;

    async fn increment_sold(&mut self, id: ProductId) -> Result<()>;
}

/// Balance reads and writes for user accounts.
#[async_trait]
pub trait AccountRepository: Send {
    async fn find_account(&mut self, user_id: UserId) -> Result<Option<Account>>;

    /// Reads and row-locks an account for the rest of the transaction.
    async fn lock_account(&mut self, user_id: UserId) -> Result<Option<Account>>;

    /// Debits the balance, failing with `ConcurrencyConflict` if it no longer
    /// covers `amount`. Returns the new balance.
    async fn debit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money>;

    /// Credits the balance. Returns the new balance.
    async fn credit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money>;

    async fn set_balance(&mut self, user_id: UserId, balance: Money) -> Result<()>;
}

/// Read-only access to sellers.
#[async_trait]
pub trait StorefrontRepository: Send {
    async fn find_storefront(&mut self, id: StoreId) -> Result<Option<Storefront>>;

    async fn find_storefront_by_owner(&mut self, owner_id: UserId) -> Result<Option<Storefront>>;
}

/// Carts and their line items.
#[async_trait]
pub trait CartRepository: Send {
    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Reads and row-locks the user's cart.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Returns the user's cart, creating an empty one first if needed, and
    /// row-locks it.
    async fn lock_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord>;

    /// Lines of a cart in the order they were first added.
    async fn line_items(&mut self, cart_id: CartId) -> Result<Vec<CartLineItem>>;

    async fn find_line_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineItem>>;

    /// Inserts the line or replaces quantity and prices of the existing line
    /// for the same product.
    async fn save_line_item(&mut self, item: &CartLineItem) -> Result<()>;

    async fn delete_line_item(&mut self, cart_id: CartId, product_id: ProductId) -> Result<()>;

    /// Deletes every line of the cart. Returns how many were removed.
    async fn clear_line_items(&mut self, cart_id: CartId) -> Result<u64>;

    async fn set_cart_total(&mut self, cart_id: CartId, total: Money) -> Result<()>;
}

/// Append-only order history.
#[async_trait]
pub trait OrderRepository: Send {
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()>;

    async fn insert_order_items(&mut self, items: &[OrderLineItem]) -> Result<()>;

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Orders of a user, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>>;

    /// Lines of the given orders, ordered by order then line number.
    async fn order_items(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineItem>>;

    /// Order lines for any of the products, newest order first.
    async fn sales_for_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<SaleRecord>>;
}

/// A unit of work over every repository.
///
/// Writes become visible to other transactions only after [`commit`]. A
/// transaction dropped without committing is rolled back.
///
/// [`commit`]: Transaction::commit
#[async_trait]
pub trait Transaction:
    ProductRepository
    + AccountRepository
    + StorefrontRepository
    + CartRepository
    + OrderRepository
    + Send
{
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// The transactional boundary.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: Transaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}
