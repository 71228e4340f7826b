//! # Shipping Zone Repository

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sql_timestamp;
use emporium_core::{Money, ShippingZone};

const ZONE_COLUMNS: &str = "id, name, price_per_kg, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct ZoneRow {
    id: i64,
    name: String,
    price_per_kg: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ZoneRow> for ShippingZone {
    fn from(row: ZoneRow) -> Self {
        ShippingZone {
            id: row.id,
            name: row.name,
            price_per_kg: Money::from_minor(row.price_per_kg),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for shipping zone CRUD.
#[derive(Debug, Clone)]
pub struct ZoneRepository {
    pool: SqlitePool,
}

impl ZoneRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ZoneRepository { pool }
    }

    /// Every zone, ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<ShippingZone>> {
        fetch_all(&self.pool).await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ShippingZone>> {
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            "SELECT {ZONE_COLUMNS} FROM shipping_zones WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ShippingZone::from))
    }

    pub async fn create(&self, name: &str, price_per_kg: Money) -> DbResult<ShippingZone> {
        debug!(name = %name, price_per_kg = price_per_kg.minor(), "Creating shipping zone");

        let now = sql_timestamp(Utc::now());
        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            r#"
            INSERT INTO shipping_zones (name, price_per_kg, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING {ZONE_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(price_per_kg.minor())
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn update(&self, id: i64, name: &str, price_per_kg: Money) -> DbResult<ShippingZone> {
        debug!(id, name = %name, "Updating shipping zone");

        let row = sqlx::query_as::<_, ZoneRow>(&format!(
            r#"
            UPDATE shipping_zones SET name = ?2, price_per_kg = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING {ZONE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(price_per_kg.minor())
        .bind(sql_timestamp(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShippingZone::from)
            .ok_or_else(|| DbError::not_found("ShippingZone", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting shipping zone");

        let result = sqlx::query("DELETE FROM shipping_zones WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ShippingZone", id));
        }
        Ok(())
    }
}

/// Loads every zone through any executor (pool or open transaction).
pub async fn fetch_all<'e, E>(executor: E) -> DbResult<Vec<ShippingZone>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, ZoneRow>(&format!(
        "SELECT {ZONE_COLUMNS} FROM shipping_zones ORDER BY name"
    ))
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(ShippingZone::from).collect())
}
