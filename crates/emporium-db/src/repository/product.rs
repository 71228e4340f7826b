//! # Product Repository
//!
//! Catalog rows and the stock column checkout and reconciliation mutate.
//!
//! ## Checkout Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE products SET stock = stock WHERE id IN (1, 2)   ◄── lock      │
//! │    SELECT ... FROM products WHERE id IN (1, 2)            ◄── read      │
//! │    ... price, quote, invoice, insert order ...                          │
//! │    UPDATE products SET stock = stock - 2                                │
//! │      WHERE id = 1 AND stock >= 2                          ◄── guard     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The no-op UPDATE takes SQLite's write lock before anything is read,    │
//! │  so the stock seen by the SELECT cannot change until COMMIT. A second   │
//! │  checkout blocks on the busy timeout at its own first statement.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sql_timestamp;
use emporium_core::{Money, Product};

const PRODUCT_COLUMNS: &str = "id, name, price, weight_grams, stock, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: i64,
    weight_grams: i64,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price: Money::from_minor(row.price),
            weight_grams: row.weight_grams,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub weight_grams: i64,
    pub stock: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product and returns the stored row.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, "Inserting product");

        let now = sql_timestamp(Utc::now());
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, price, weight_grams, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(product.price.minor())
        .bind(product.weight_grams)
        .bind(product.stock)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// All products ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Takes the write lock over the given product rows.
///
/// Must be the first statement of the checkout transaction.
pub async fn lock_for_checkout<'e, E>(executor: E, ids: &[i64]) -> DbResult<u64>
where
    E: SqliteExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET stock = stock WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(executor).await?;
    debug!(requested = ids.len(), locked = result.rows_affected(), "Locked product rows");
    Ok(result.rows_affected())
}

/// Loads the given products keyed by id. Missing ids are simply absent.
pub async fn fetch_by_ids<'e, E>(executor: E, ids: &[i64]) -> DbResult<HashMap<i64, Product>>
where
    E: SqliteExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("
    ));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let rows = builder
        .build_query_as::<ProductRow>()
        .fetch_all(executor)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.id, Product::from(row)))
        .collect())
}

/// Decrements stock if at least `quantity` units remain.
///
/// Returns `false` when the guard rejected the update.
pub async fn decrement_stock<'e, E>(executor: E, id: i64, quantity: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(sql_timestamp(Utc::now()))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns units to stock. Returns `false` if the product no longer exists.
pub async fn restore_stock<'e, E>(executor: E, id: i64, quantity: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(sql_timestamp(Utc::now()))
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Kaos Polos".to_string(),
                price: Money::from_minor(25_000),
                weight_grams: 250,
                stock: 3,
            })
            .await
            .unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, product) = setup().await;
        let loaded = db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Kaos Polos");
        assert_eq!(loaded.price.minor(), 25_000);
        assert!(db.products().get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decrement_guard() {
        let (db, product) = setup().await;
        assert!(decrement_stock(db.pool(), product.id, 2).await.unwrap());
        assert!(!decrement_stock(db.pool(), product.id, 2).await.unwrap());

        let stock = db.products().get_by_id(product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 1);
    }

    #[tokio::test]
    async fn test_lock_and_fetch_in_transaction() {
        let (db, product) = setup().await;
        let mut tx = db.begin().await.unwrap();

        let locked = lock_for_checkout(&mut *tx, &[product.id, 404]).await.unwrap();
        assert_eq!(locked, 1);

        let found = fetch_by_ids(&mut *tx, &[product.id, 404]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&product.id));

        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_stock() {
        let (db, product) = setup().await;
        assert!(restore_stock(db.pool(), product.id, 2).await.unwrap());
        assert!(!restore_stock(db.pool(), 404, 2).await.unwrap());
        assert_eq!(db.products().get_by_id(product.id).await.unwrap().unwrap().stock, 5);
    }
}
