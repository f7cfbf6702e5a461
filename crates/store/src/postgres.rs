use async_trait::async_trait;
use common::{CartId, LineItemId, Money, OrderId, ProductId, StoreId, UserId};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};
use uuid::Uuid;

use crate::records::{
    Account, CartLineItem, CartRecord, OrderLineItem, OrderRecord, Product, SaleRecord,
    Storefront,
};
use crate::store::{
    AccountRepository, CartRepository, OrderRepository, ProductRepository, Store,
    StorefrontRepository, Transaction,
};
use crate::{Result, StoreError};

const PRODUCT_COLUMNS: &str =
    "id, store_id, title, unit_price_cents, available_quantity, sold";
const CART_COLUMNS: &str = "id, user_id, total_price_cents, updated_at";
const LINE_ITEM_COLUMNS: &str =
    "id, cart_id, product_id, quantity, unit_price_cents, subtotal_cents, added_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, line_number, product_id, quantity, unit_price_cents, subtotal_cents";

/// PostgreSQL-backed store implementation.
///
/// Transactions run at the server default `READ COMMITTED` isolation and take
/// `SELECT ... FOR UPDATE` row locks on the cart, account and product rows
/// they read with a `lock_*` method.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back by sqlx when dropped.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidValue(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::OutOfRange(format!("{what} exceeds {}: {value}", i32::MAX)))
}

fn to_uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        title: row.try_get("title")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        available_quantity: to_u32(row.try_get("available_quantity")?, "available_quantity")?,
        sold: to_u32(row.try_get("sold")?, "sold")?,
    })
}

fn row_to_account(row: PgRow) -> Result<Account> {
    Ok(Account {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        name: row.try_get("name")?,
        is_admin: row.try_get("is_admin")?,
        balance: Money::from_cents(row.try_get("balance_cents")?),
    })
}

fn row_to_storefront(row: PgRow) -> Result<Storefront> {
    Ok(Storefront {
        id: StoreId::from_uuid(row.try_get("id")?),
        owner_id: UserId::from_uuid(row.try_get("owner_id")?),
        name: row.try_get("name")?,
    })
}

fn row_to_cart(row: PgRow) -> Result<CartRecord> {
    Ok(CartRecord {
        id: CartId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_line_item(row: PgRow) -> Result<CartLineItem> {
    Ok(CartLineItem {
        id: LineItemId::from_uuid(row.try_get("id")?),
        cart_id: CartId::from_uuid(row.try_get("cart_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        added_at: row.try_get("added_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderLineItem> {
    Ok(OrderLineItem {
        id: LineItemId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        line_number: to_u32(row.try_get("line_number")?, "line_number")?,
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
    })
}

#[async_trait]
impl ProductRepository for PostgresTransaction {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_product).transpose()
    }

    async fn find_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(to_uuids(ids))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(to_uuids(ids))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn products_for_store(&mut self, store_id: StoreId) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE store_id = $1 ORDER BY id"
        ))
        .bind(store_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> Result<u32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET available_quantity = available_quantity - $2
            WHERE id = $1 AND available_quantity >= $2
            RETURNING available_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .fetch_optional(&mut *self.tx)
        .await?;

        match remaining {
            Some(remaining) => to_u32(remaining, "available_quantity"),
            None => Err(StoreError::conflict(
                "product",
                format!("{id} no longer holds {quantity} units"),
            )),
        }
    }

    async fn increment_sold(&mut self, id: ProductId) -> Result<()> {
        let result = sqlx::query("UPDATE products SET sold = sold + 1 WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict("product", format!("{id} no longer exists")));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PostgresTransaction {
    async fn find_account(&mut self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT user_id, name, is_admin, balance_cents FROM accounts WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_account).transpose()
    }

    async fn lock_account(&mut self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, name, is_admin, balance_cents
            FROM accounts
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_account).transpose()
    }

    async fn debit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - $2
            WHERE user_id = $1 AND balance_cents >= $2
            RETURNING balance_cents
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(amount.cents())
        .fetch_optional(&mut *self.tx)
        .await?;

        balance.map(Money::from_cents).ok_or_else(|| {
            StoreError::conflict("account", format!("{user_id} balance cannot cover {amount}"))
        })
    }

    async fn credit_balance(&mut self, user_id: UserId, amount: Money) -> Result<Money> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + $2
            WHERE user_id = $1
            RETURNING balance_cents
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(amount.cents())
        .fetch_optional(&mut *self.tx)
        .await?;

        balance
            .map(Money::from_cents)
            .ok_or_else(|| StoreError::conflict("account", format!("{user_id} no longer exists")))
    }

    async fn set_balance(&mut self, user_id: UserId, balance: Money) -> Result<()> {
        let result = sqlx::query("UPDATE accounts SET balance_cents = $2 WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .bind(balance.cents())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict("account", format!("{user_id} no longer exists")));
        }
        Ok(())
    }
}

#[async_trait]
impl StorefrontRepository for PostgresTransaction {
    async fn find_storefront(&mut self, id: StoreId) -> Result<Option<Storefront>> {
        let row = sqlx::query("SELECT id, owner_id, name FROM storefronts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(row_to_storefront).transpose()
    }

    async fn find_storefront_by_owner(&mut self, owner_id: UserId) -> Result<Option<Storefront>> {
        let row = sqlx::query("SELECT id, owner_id, name FROM storefronts WHERE owner_id = $1")
            .bind(owner_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(row_to_storefront).transpose()
    }
}

#[async_trait]
impl CartRepository for PostgresTransaction {
    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(row_to_cart).transpose()
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_cart).transpose()
    }

    async fn lock_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        // Concurrent first adds race on the unique user_id; the loser's insert
        // becomes a no-op and both end up locking the same row.
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, total_price_cents, updated_at)
            VALUES ($1, $2, 0, NOW())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(CartId::new().as_uuid())
        .bind(user_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_cart(row)
    }

    async fn line_items(&mut self, cart_id: CartId) -> Result<Vec<CartLineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id"
        ))
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_line_item).collect()
    }

    async fn find_line_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineItem>> {
        let row = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 AND product_id = $2"
        ))
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_line_item).transpose()
    }

    async fn save_line_item(&mut self, item: &CartLineItem) -> Result<()> {
        if item.quantity == 0 {
            return Err(StoreError::InvalidValue(format!(
                "line item {} must have a positive quantity",
                item.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO cart_items
                (id, cart_id, product_id, quantity, unit_price_cents, subtotal_cents, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                unit_price_cents = EXCLUDED.unit_price_cents,
                subtotal_cents = EXCLUDED.subtotal_cents
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.cart_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(to_i32(item.quantity, "quantity")?)
        .bind(item.unit_price.cents())
        .bind(item.subtotal.cents())
        .bind(item.added_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_line_item(&mut self, cart_id: CartId, product_id: ProductId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id.as_uuid())
            .bind(product_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn clear_line_items(&mut self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn set_cart_total(&mut self, cart_id: CartId, total: Money) -> Result<()> {
        let result = sqlx::query(
            "UPDATE carts SET total_price_cents = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(cart_id.as_uuid())
        .bind(total.cents())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict("cart", format!("{cart_id} no longer exists")));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresTransaction {
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_price_cents, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.total_price.cents())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderLineItem]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, line_number, product_id, quantity, unit_price_cents, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(to_i32(item.line_number, "line_number")?)
            .bind(item.product_id.as_uuid())
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.unit_price.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, total_price_cents, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_price_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn order_items(&mut self, order_ids: &[OrderId]) -> Result<Vec<OrderLineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_number"
        ))
        .bind(to_uuids(order_ids))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_order_item).collect()
    }

    async fn sales_for_products(&mut self, product_ids: &[ProductId]) -> Result<Vec<SaleRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.order_id, oi.line_number, oi.product_id, oi.quantity,
                   oi.unit_price_cents, oi.subtotal_cents,
                   o.created_at AS ordered_at, a.name AS buyer_name
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN accounts a ON a.user_id = o.user_id
            WHERE oi.product_id = ANY($1)
            ORDER BY o.created_at DESC, oi.order_id, oi.line_number
            "#,
        )
        .bind(to_uuids(product_ids))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SaleRecord {
                    line: row_to_order_item(row)?,
                    buyer_name: row.try_get("buyer_name")?,
                    ordered_at: row.try_get("ordered_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
