//! # Inventory Guard
//!
//! Stock reads and writes inside an open checkout or reconciliation
//! transaction. Every function takes the transaction's connection; none
//! of them commit.

use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::{debug, warn};

use emporium_core::{CheckoutLine, CoreError, PricedLine, Product};
use emporium_db::repository::product;

use crate::error::CheckoutError;

/// Locks the referenced product rows and returns their current state.
///
/// Must run first in the transaction; see `product::lock_for_checkout`.
pub async fn lock_products(
    conn: &mut SqliteConnection,
    lines: &[CheckoutLine],
) -> Result<HashMap<i64, Product>, CheckoutError> {
    let ids: Vec<i64> = lines.iter().map(|line| line.product_id).collect();

    product::lock_for_checkout(&mut *conn, &ids).await?;
    let products = product::fetch_by_ids(&mut *conn, &ids).await?;

    debug!(requested = ids.len(), found = products.len(), "Loaded products under lock");
    Ok(products)
}

/// Takes every priced line out of stock.
///
/// Lines were checked against locked rows, so the guard only fails if the
/// lock was bypassed. That still surfaces as `InsufficientStock` and the
/// caller's transaction rolls back.
pub async fn decrement_all(conn: &mut SqliteConnection, lines: &[PricedLine]) -> Result<(), CheckoutError> {
    for line in lines {
        if !product::decrement_stock(&mut *conn, line.product_id, line.quantity).await? {
            let available = product::fetch_by_ids(&mut *conn, &[line.product_id])
                .await?
                .get(&line.product_id)
                .map(|p| p.stock)
                .unwrap_or(0);

            warn!(
                product_id = line.product_id,
                available,
                requested = line.quantity,
                "Stock guard rejected decrement"
            );
            return Err(CoreError::InsufficientStock {
                product: line.name.clone(),
                available,
                requested: line.quantity,
            }
            .into());
        }
    }
    Ok(())
}

/// Returns `quantity` units of `product_id` to stock.
///
/// A product deleted since the order was placed is skipped.
pub async fn restore(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> Result<(), emporium_db::DbError> {
    if !product::restore_stock(&mut *conn, product_id, quantity).await? {
        warn!(product_id, quantity, "Product missing, stock not restored");
    }
    Ok(())
}

/// Takes `quantity` units of `product_id` out of stock again after a
/// restore. Returns `false` if the guard refused; stock is then left as is.
pub async fn retake(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> Result<bool, emporium_db::DbError> {
    let taken = product::decrement_stock(&mut *conn, product_id, quantity).await?;
    if !taken {
        warn!(product_id, quantity, "Stock guard refused retake, units oversold");
    }
    Ok(taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_core::Money;
    use emporium_db::{Database, DbConfig, NewProduct};

    async fn setup(stock: i64) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Tas Kanvas".to_string(),
                price: Money::from_minor(15_000),
                weight_grams: 500,
                stock,
            })
            .await
            .unwrap();
        (db, product)
    }

    fn priced(product: &Product, quantity: i64) -> PricedLine {
        PricedLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            unit_price: product.price,
        }
    }

    #[tokio::test]
    async fn test_lock_products_skips_unknown_ids() {
        let (db, product) = setup(5).await;
        let mut tx = db.begin().await.unwrap();

        let lines = [
            CheckoutLine { product_id: product.id, quantity: 1 },
            CheckoutLine { product_id: 404, quantity: 1 },
        ];
        let products = lock_products(&mut tx, &lines).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[&product.id].stock, 5);

        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_decrement_all_reports_shortfall() {
        let (db, product) = setup(2).await;
        let mut tx = db.begin().await.unwrap();

        let err = decrement_all(&mut tx, &[priced(&product, 3)]).await.unwrap_err();
        match err {
            CheckoutError::Rejected(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        tx.rollback().await.unwrap();

        assert_eq!(db.products().get_by_id(product.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_restore_missing_product_is_ignored() {
        let (db, product) = setup(1).await;
        let mut tx = db.begin().await.unwrap();
        restore(&mut tx, product.id, 4).await.unwrap();
        restore(&mut tx, 404, 4).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(product.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_retake_respects_guard() {
        let (db, product) = setup(3).await;
        let mut tx = db.begin().await.unwrap();
        assert!(retake(&mut tx, product.id, 2).await.unwrap());
        assert!(!retake(&mut tx, product.id, 2).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(product.id).await.unwrap().unwrap().stock, 1);
    }
}
