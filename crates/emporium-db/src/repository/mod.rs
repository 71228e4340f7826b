//! # Repository Module
//!
//! Database repository implementations for Emporium.
//!
//! ## Two Access Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool-backed repositories            Executor functions                 │
//! │  ────────────────────────            ──────────────────                 │
//! │  db.orders().list_for_user(..)       order::insert_order(&mut *tx, ..)  │
//! │  db.zones().create(..)               product::lock_for_checkout(..)     │
//! │  db.notifications().enqueue(..)      order::mark_paid(&mut *tx, ..)     │
//! │                                                                         │
//! │  Each call is its own statement      Generic over SqliteExecutor, so    │
//! │  on a pooled connection.             callers compose them inside one    │
//! │                                      transaction (checkout, reconcile). │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog rows and stock
//! - [`ZoneRepository`](zone::ZoneRepository) - Shipping zone CRUD
//! - [`OrderRepository`](order::OrderRepository) - Orders and order items
//! - [`NotificationRepository`](notification::NotificationRepository) - Payment notification inbox

use chrono::{DateTime, Utc};

pub mod notification;
pub mod order;
pub mod product;
pub mod zone;

/// Fixed-width RFC 3339 text so stored timestamps compare correctly as strings.
pub(crate) fn sql_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
