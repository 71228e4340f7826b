//! # Shipping Calculator
//!
//! Zone lookup with a read-through cache, plus the zone admin writes that
//! keep the cache honest.
//!
//! ```text
//!   calculate(weight, zone_id)
//!        │
//!        ▼
//!   cache "shipping_zones:all" ──hit──► find zone ──► quote
//!        │ miss
//!        ▼
//!   SELECT ... FROM shipping_zones ──► put(ttl) ──► find zone ──► quote
//! ```

use sqlx::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use emporium_core::validation::{validate_price_per_kg, validate_zone_name};
use emporium_core::{shipping, CoreError, Money, ShippingQuote, ShippingZone};
use emporium_db::repository::zone;
use emporium_db::{Database, DbError, DbResult};

use crate::cache::{Cache, ZONES_CACHE_KEY};
use crate::error::CheckoutError;

/// Failure of a zone admin write.
#[derive(Debug, thiserror::Error)]
pub enum ZoneAdminError {
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<emporium_core::ValidationError> for ZoneAdminError {
    fn from(err: emporium_core::ValidationError) -> Self {
        ZoneAdminError::Rejected(err.into())
    }
}

#[derive(Clone)]
pub struct ShippingCalculator {
    db: Database,
    cache: Arc<dyn Cache<Vec<ShippingZone>>>,
    ttl: Duration,
}

impl ShippingCalculator {
    pub fn new(db: Database, cache: Arc<dyn Cache<Vec<ShippingZone>>>, ttl: Duration) -> Self {
        ShippingCalculator { db, cache, ttl }
    }

    /// Every zone, ordered by name.
    pub async fn zones(&self) -> DbResult<Vec<ShippingZone>> {
        if let Some(zones) = self.cache.get(ZONES_CACHE_KEY) {
            return Ok(zones);
        }
        let zones = zone::fetch_all(self.db.pool()).await?;
        self.remember(&zones);
        Ok(zones)
    }

    /// Quotes `weight_grams` to `zone_id`, reading zones through the pool.
    pub async fn calculate(&self, weight_grams: i64, zone_id: i64) -> Result<ShippingQuote, CheckoutError> {
        let zones = self.zones().await?;
        quote_from(&zones, weight_grams, zone_id)
    }

    /// Same as [`calculate`](Self::calculate) but reads through an open
    /// transaction on a cache miss.
    pub async fn calculate_in(
        &self,
        conn: &mut SqliteConnection,
        weight_grams: i64,
        zone_id: i64,
    ) -> Result<ShippingQuote, CheckoutError> {
        let zones = match self.cache.get(ZONES_CACHE_KEY) {
            Some(zones) => zones,
            None => {
                let zones = zone::fetch_all(&mut *conn).await?;
                self.remember(&zones);
                zones
            }
        };
        quote_from(&zones, weight_grams, zone_id)
    }

    pub async fn create_zone(&self, name: &str, price_per_kg: i64) -> Result<ShippingZone, ZoneAdminError> {
        let name = validate_zone_name(name)?;
        validate_price_per_kg(price_per_kg)?;

        let created = self.db.zones().create(&name, Money::from_minor(price_per_kg)).await?;
        self.invalidate();
        info!(id = created.id, name = %created.name, "Shipping zone created");
        Ok(created)
    }

    pub async fn update_zone(&self, id: i64, name: &str, price_per_kg: i64) -> Result<ShippingZone, ZoneAdminError> {
        let name = validate_zone_name(name)?;
        validate_price_per_kg(price_per_kg)?;

        let updated = self
            .db
            .zones()
            .update(id, &name, Money::from_minor(price_per_kg))
            .await
            .map_err(|e| not_found_as_rejection(e, id))?;
        self.invalidate();
        info!(id, name = %updated.name, "Shipping zone updated");
        Ok(updated)
    }

    /// Deletes a zone. Existing orders keep their snapshotted zone name.
    pub async fn delete_zone(&self, id: i64) -> Result<(), ZoneAdminError> {
        self.db
            .zones()
            .delete(id)
            .await
            .map_err(|e| not_found_as_rejection(e, id))?;
        self.invalidate();
        info!(id, "Shipping zone deleted");
        Ok(())
    }

    fn remember(&self, zones: &[ShippingZone]) {
        debug!(count = zones.len(), "Caching shipping zones");
        self.cache.put(ZONES_CACHE_KEY, zones.to_vec(), self.ttl);
    }

    fn invalidate(&self) {
        self.cache.invalidate(ZONES_CACHE_KEY);
    }
}

fn quote_from(zones: &[ShippingZone], weight_grams: i64, zone_id: i64) -> Result<ShippingQuote, CheckoutError> {
    let zone = zones
        .iter()
        .find(|z| z.id == zone_id)
        .ok_or(CoreError::ZoneNotFound(zone_id))?;
    Ok(shipping::quote(zone, weight_grams))
}

fn not_found_as_rejection(err: DbError, id: i64) -> ZoneAdminError {
    if err.is_not_found() {
        ZoneAdminError::Rejected(CoreError::ZoneNotFound(id))
    } else {
        ZoneAdminError::Storage(err)
    }
}
