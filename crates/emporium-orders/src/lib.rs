//! # emporium-orders: Checkout and Payment Services for Emporium
//!
//! Every workflow that spans more than one repository call, and every
//! transaction boundary, lives in this crate.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /customer/checkout            POST /payment/midtrans/callback     │
//! │          │                                     │                        │
//! │          ▼                                     ▼                        │
//! │  ┌────────────────────┐              ┌───────────────────────┐          │
//! │  │  CheckoutService   │              │ payment_notifications │          │
//! │  │                    │              │ (inbox, verbatim)     │          │
//! │  │  inventory         │              └──────────┬────────────┘          │
//! │  │  ShippingCalculator│◄── Cache                │ wake                  │
//! │  │  InvoiceGenerator  │                         ▼                       │
//! │  └─────────┬──────────┘              ┌───────────────────────┐          │
//! │            │ Order                   │  NotificationWorker   │          │
//! │            ▼                         │   NotificationReconciler         │
//! │  ┌────────────────────┐              │   retry / reject / fail│         │
//! │  │  PaymentGateway    │──► Snap API  └───────────────────────┘          │
//! │  │  (SnapApi trait)   │                                                 │
//! │  └────────────────────┘                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`checkout`] - `CheckoutService`: cart to order in one transaction
//! - [`inventory`] - Row locking, stock decrement and restore
//! - [`shipping`] - `ShippingCalculator` and zone administration
//! - [`cache`] - `Cache` trait and in-memory TTL implementation
//! - [`invoice`] - `InvoiceGenerator`
//! - [`gateway`] - `PaymentGateway`, `SnapApi`, `MidtransSnapClient`
//! - [`reconciler`] - `NotificationReconciler`
//! - [`worker`] - `NotificationWorker` over the notification inbox
//! - [`config`] - `CommerceConfig` (TOML + environment)
//! - [`error`] - Service error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emporium_orders::{CommerceConfig, CheckoutService, CheckoutRequest};
//!
//! let config = CommerceConfig::load(None)?;
//! let order = checkout.checkout(&CheckoutRequest { items, shipping_zone_id, user_id }).await?;
//! ```

pub mod cache;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod invoice;
pub mod reconciler;
pub mod shipping;
pub mod worker;

pub use cache::{Cache, MemoryCache};
pub use checkout::{CheckoutRequest, CheckoutService};
pub use config::CommerceConfig;
pub use error::{
    CheckoutAndPayError, CheckoutError, ConfigError, GatewayError, ReconcileError, SessionError, WorkerError,
};
pub use gateway::{MidtransSnapClient, PaymentGateway, SnapApi};
pub use invoice::InvoiceGenerator;
pub use reconciler::{NotificationReconciler, ReconcileOutcome};
pub use shipping::{ShippingCalculator, ZoneAdminError};
pub use worker::{Disposition, NotificationHandler, NotificationWorker, NotificationWorkerHandle};
