//! # Order Repository
//!
//! Orders, their items, and the compare-and-set transitions payment
//! reconciliation relies on.
//!
//! ## Guarded Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mark_paid                                                              │
//! │    UPDATE orders SET status='paid', payment_status='paid', paid_at=?    │
//! │    WHERE id=? AND payment_status != 'paid'                              │
//! │                                                                         │
//! │  mark_cancelled                                                         │
//! │    UPDATE orders SET status='cancelled', payment_status='unpaid'        │
//! │    WHERE id=? AND status != 'cancelled' AND payment_status != 'paid'    │
//! │                                                                         │
//! │  rows_affected == 1  → this caller performed the transition             │
//! │  rows_affected == 0  → someone else already did (or it is not allowed)  │
//! │                                                                         │
//! │  Duplicate or concurrent notifications therefore restore stock at most  │
//! │  once and never move paid_at.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sql_timestamp;
use emporium_core::{Money, Order, OrderItem, OrderStatus, Page, PaymentStatus};

const ORDER_COLUMNS: &str = r#"
    id, invoice_number, user_id, total_price, shipping_cost, shipping_zone,
    status, payment_status, payment_type, transaction_id, snap_token,
    paid_at, created_at, updated_at
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    invoice_number: String,
    user_id: i64,
    total_price: i64,
    shipping_cost: i64,
    shipping_zone: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_type: Option<String>,
    transaction_id: Option<String>,
    snap_token: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            invoice_number: self.invoice_number,
            user_id: self.user_id,
            total_price: Money::from_minor(self.total_price),
            shipping_cost: Money::from_minor(self.shipping_cost),
            shipping_zone: self.shipping_zone,
            status: self.status,
            payment_status: self.payment_status,
            payment_type: self.payment_type,
            transaction_id: self.transaction_id,
            snap_token: self.snap_token,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: Option<String>,
    quantity: i64,
    price: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: Money::from_minor(row.price),
        }
    }
}

/// Header fields written by checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub invoice_number: String,
    pub user_id: i64,
    pub total_price: Money,
    pub shipping_cost: Money,
    pub shipping_zone: String,
}

/// Repository for order queries and administrative updates.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        attach_one(&mut conn, row).await
    }

    /// Loads an order only if it belongs to `user_id`.
    pub async fn get_for_user(&self, id: i64, user_id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        attach_one(&mut conn, row).await
    }

    pub async fn get_by_invoice(&self, invoice_number: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_by_invoice(&mut conn, invoice_number).await
    }

    /// A customer's orders, newest first.
    pub async fn list_for_user(&self, user_id: i64, page: u32, per_page: u32) -> DbResult<Page<Order>> {
        debug!(user_id, page, per_page, "Listing customer orders");

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(user_id)
        .bind(per_page as i64)
        .bind(Page::<Order>::offset(page, per_page))
        .fetch_all(&mut *conn)
        .await?;

        let items = attach_many(&mut conn, rows).await?;
        Ok(Page { items, page, per_page, total })
    }

    /// All orders, optionally filtered by status, newest first.
    pub async fn list(&self, status: Option<OrderStatus>, page: u32, per_page: u32) -> DbResult<Page<Order>> {
        debug!(?status, page, per_page, "Listing orders");

        let mut conn = self.pool.acquire().await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE (?1 IS NULL OR status = ?1)")
                .bind(status)
                .fetch_one(&mut *conn)
                .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(status)
        .bind(per_page as i64)
        .bind(Page::<Order>::offset(page, per_page))
        .fetch_all(&mut *conn)
        .await?;

        let items = attach_many(&mut conn, rows).await?;
        Ok(Page { items, page, per_page, total })
    }

    /// Sets the fulfilment status only. Payment fields are untouched.
    pub async fn update_status(&self, id: i64, status: OrderStatus) -> DbResult<Order> {
        debug!(id, %status, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(sql_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Stores the latest payment session token.
    pub async fn set_snap_token(&self, id: i64, token: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET snap_token = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(token)
            .bind(sql_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }
        Ok(())
    }
}

async fn attach_one(conn: &mut SqliteConnection, row: Option<OrderRow>) -> DbResult<Option<Order>> {
    match row {
        Some(row) => {
            let items = fetch_items(&mut *conn, row.id).await?;
            Ok(Some(row.into_order(items)))
        }
        None => Ok(None),
    }
}

async fn attach_many(conn: &mut SqliteConnection, rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
        FROM order_items oi
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id IN (
        "#,
    );
    let mut separated = builder.separated(", ");
    for row in &rows {
        separated.push_bind(row.id);
    }
    separated.push_unseparated(") ORDER BY oi.id");

    let item_rows = builder
        .build_query_as::<OrderItemRow>()
        .fetch_all(&mut *conn)
        .await?;

    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in item_rows {
        by_order.entry(item.order_id).or_default().push(item.into());
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            row.into_order(items)
        })
        .collect())
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Items of one order, with the current catalog name when the product exists.
pub async fn fetch_items<'e, E>(executor: E, order_id: i64) -> DbResult<Vec<OrderItem>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
        FROM order_items oi
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?1
        ORDER BY oi.id
        "#,
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// Loads an order with items by invoice number.
pub async fn load_by_invoice(conn: &mut SqliteConnection, invoice_number: &str) -> DbResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE invoice_number = ?1"
    ))
    .bind(invoice_number)
    .fetch_optional(&mut *conn)
    .await?;

    attach_one(conn, row).await
}

pub async fn invoice_exists<'e, E>(executor: E, invoice_number: &str) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE invoice_number = ?1)")
        .bind(invoice_number)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

/// Inserts a pending, unpaid order header and returns its id.
pub async fn insert_order<'e, E>(executor: E, order: &NewOrder, now: DateTime<Utc>) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    debug!(invoice = %order.invoice_number, total = order.total_price.minor(), "Inserting order");

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO orders (
            invoice_number, user_id, total_price, shipping_cost, shipping_zone,
            status, payment_status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        RETURNING id
        "#,
    )
    .bind(&order.invoice_number)
    .bind(order.user_id)
    .bind(order.total_price.minor())
    .bind(order.shipping_cost.minor())
    .bind(&order.shipping_zone)
    .bind(OrderStatus::Pending)
    .bind(PaymentStatus::Unpaid)
    .bind(sql_timestamp(now))
    .fetch_one(executor)
    .await?;

    Ok(id)
}

pub async fn insert_item<'e, E>(
    executor: E,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: Money,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?1, ?2, ?3, ?4)")
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price.minor())
        .execute(executor)
        .await?;
    Ok(())
}

/// Stores provider payment details without erasing known values.
///
/// A paid order keeps the details of the payment that settled it.
pub async fn record_payment_details<'e, E>(
    executor: E,
    order_id: i64,
    payment_type: Option<&str>,
    transaction_id: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE orders SET
            payment_type = COALESCE(?2, payment_type),
            transaction_id = COALESCE(?3, transaction_id),
            updated_at = ?4
        WHERE id = ?1 AND payment_status != ?5
        "#,
    )
    .bind(order_id)
    .bind(payment_type)
    .bind(transaction_id)
    .bind(sql_timestamp(now))
    .bind(PaymentStatus::Paid)
    .execute(executor)
    .await?;
    Ok(())
}

/// Transitions an unpaid order to paid. Returns `true` if this call did it.
pub async fn mark_paid<'e, E>(executor: E, order_id: i64, now: DateTime<Utc>) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders SET status = ?2, payment_status = ?3, paid_at = ?4, updated_at = ?4
        WHERE id = ?1 AND payment_status != ?3
        "#,
    )
    .bind(order_id)
    .bind(OrderStatus::Paid)
    .bind(PaymentStatus::Paid)
    .bind(sql_timestamp(now))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Cancels an unpaid, not yet cancelled order. Returns `true` if this call did it.
pub async fn mark_cancelled<'e, E>(executor: E, order_id: i64, now: DateTime<Utc>) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders SET status = ?2, payment_status = ?3, updated_at = ?4
        WHERE id = ?1 AND status != ?2 AND payment_status != ?5
        "#,
    )
    .bind(order_id)
    .bind(OrderStatus::Cancelled)
    .bind(PaymentStatus::Unpaid)
    .bind(sql_timestamp(now))
    .bind(PaymentStatus::Paid)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::{NewProduct, ProductRepository};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = ProductRepository::new(db.pool().clone())
            .insert(&NewProduct {
                name: "Kaos Polos".to_string(),
                price: Money::from_minor(25_000),
                weight_grams: 250,
                stock: 10,
            })
            .await
            .unwrap();

        let order = NewOrder {
            invoice_number: "INV-20261016-0001".to_string(),
            user_id: 7,
            total_price: Money::from_minor(60_000),
            shipping_cost: Money::from_minor(10_000),
            shipping_zone: "Jawa".to_string(),
        };
        let order_id = insert_order(db.pool(), &order, Utc::now()).await.unwrap();
        insert_item(db.pool(), order_id, product.id, 2, Money::from_minor(25_000))
            .await
            .unwrap();
        (db, order_id)
    }

    #[tokio::test]
    async fn test_insert_and_load_with_items() {
        let (db, order_id) = setup().await;
        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_name.as_deref(), Some("Kaos Polos"));
        assert_eq!(order.items_subtotal().minor(), 50_000);

        assert!(invoice_exists(db.pool(), "INV-20261016-0001").await.unwrap());
        assert!(!invoice_exists(db.pool(), "INV-20261016-0002").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_invoice_is_unique_violation() {
        let (db, _) = setup().await;
        let dup = NewOrder {
            invoice_number: "INV-20261016-0001".to_string(),
            user_id: 8,
            total_price: Money::zero(),
            shipping_cost: Money::zero(),
            shipping_zone: "Jawa".to_string(),
        };
        let err = insert_order(db.pool(), &dup, Utc::now()).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_ownership_scoping() {
        let (db, order_id) = setup().await;
        assert!(db.orders().get_for_user(order_id, 7).await.unwrap().is_some());
        assert!(db.orders().get_for_user(order_id, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_paid_is_compare_and_set() {
        let (db, order_id) = setup().await;
        assert!(mark_paid(db.pool(), order_id, Utc::now()).await.unwrap());
        let first = db.orders().get_by_id(order_id).await.unwrap().unwrap();

        assert!(!mark_paid(db.pool(), order_id, Utc::now()).await.unwrap());
        let second = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(first.paid_at, second.paid_at);

        // Paid orders cannot be cancelled.
        assert!(!mark_cancelled(db.pool(), order_id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_cancelled_once() {
        let (db, order_id) = setup().await;
        assert!(mark_cancelled(db.pool(), order_id, Utc::now()).await.unwrap());
        assert!(!mark_cancelled(db.pool(), order_id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_payment_details_not_erased() {
        let (db, order_id) = setup().await;
        record_payment_details(db.pool(), order_id, Some("bank_transfer"), Some("tx-1"), Utc::now())
            .await
            .unwrap();
        record_payment_details(db.pool(), order_id, None, None, Utc::now())
            .await
            .unwrap();

        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_type.as_deref(), Some("bank_transfer"));
        assert_eq!(order.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_paid_order_keeps_payment_details() {
        let (db, order_id) = setup().await;
        record_payment_details(db.pool(), order_id, Some("bank_transfer"), Some("tx-1"), Utc::now())
            .await
            .unwrap();
        assert!(mark_paid(db.pool(), order_id, Utc::now()).await.unwrap());

        record_payment_details(db.pool(), order_id, Some("qris"), Some("tx-2"), Utc::now())
            .await
            .unwrap();
        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_type.as_deref(), Some("bank_transfer"));
        assert_eq!(order.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_listing_and_status_filter() {
        let (db, order_id) = setup().await;

        let page = db.orders().list_for_user(7, 1, 15).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].items.len(), 1);
        assert_eq!(db.orders().list_for_user(8, 1, 15).await.unwrap().total, 0);

        db.orders().update_status(order_id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(db.orders().list(Some(OrderStatus::Shipped), 1, 15).await.unwrap().total, 1);
        assert_eq!(db.orders().list(Some(OrderStatus::Pending), 1, 15).await.unwrap().total, 0);
        assert_eq!(db.orders().list(None, 1, 15).await.unwrap().total, 1);

        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    }
}
