//! # emporium-db: Database Layer for Emporium
//!
//! SQLite storage for the catalog, orders and the payment notification
//! inbox, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Emporium Data Flow                               │
//! │                                                                         │
//! │  CheckoutService / NotificationReconciler / HTTP handlers              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   emporium-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌──────────────┐ │   │
//! │  │   │   Database    │    │   Repositories   │   │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                  │   │  (embedded)  │ │   │
//! │  │   │               │    │ ProductRepo      │   │              │ │   │
//! │  │   │ SqlitePool    │◄───│ ZoneRepo         │   │ 001_initial  │ │   │
//! │  │   │ Transactions  │    │ OrderRepo        │   │   _schema    │ │   │
//! │  │   │               │    │ NotificationRepo │   │              │ │   │
//! │  │   └───────────────┘    └──────────────────┘   └──────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emporium_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("emporium.db")).await?;
//! let zones = db.zones().list_all().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::notification::NotificationRepository;
pub use repository::order::{NewOrder, OrderRepository};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::zone::ZoneRepository;
