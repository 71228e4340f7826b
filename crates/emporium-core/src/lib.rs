//! # emporium-core: Pure Business Logic for Emporium
//!
//! Everything the checkout-to-payment pipeline decides without touching a
//! database or a network socket lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Emporium Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │   /customer/checkout  /customer/orders/{id}/pay  /payment/...  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 emporium-orders (services)                      │   │
//! │  │   CheckoutService  PaymentGateway  NotificationReconciler       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ emporium-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────────┐        │   │
//! │  │   │  types  │ │ shipping │ │ invoice │ │ notification │        │   │
//! │  │   │  Order  │ │ ceil(kg) │ │ INV-... │ │  SHA-512 sig │        │   │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └──────────────┘        │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────────────┐        │   │
//! │  │   │  money  │ │   snap   │ │  roles  │ │  validation  │        │   │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └──────────────┘        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, ShippingZone, Order, OrderItem, ...)
//! - [`money`] - Money type with integer arithmetic (smallest currency unit)
//! - [`error`] - Domain error types
//! - [`checkout`] - Checkout lines and cart pricing
//! - [`validation`] - Request normalization and field rules
//! - [`shipping`] - Weight-based shipping cost
//! - [`invoice`] - `INV-YYYYMMDD-NNNN` invoice numbers
//! - [`notification`] - Provider notification parsing, signature, decision
//! - [`snap`] - Snap transaction request manifest
//! - [`roles`] - Roles and capabilities
//!
//! ## Example Usage
//!
//! ```rust
//! use emporium_core::money::Money;
//! use emporium_core::shipping::shipping_cost;
//!
//! // 1,001 grams bills as two kilograms
//! let cost = shipping_cost(1001, Money::from_minor(10_000));
//! assert_eq!(cost.minor(), 20_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod invoice;
pub mod money;
pub mod notification;
pub mod roles;
pub mod shipping;
pub mod snap;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutLine, PricedCart, PricedLine};
pub use error::{CoreError, CoreResult, NotificationError, ValidationError};
pub use invoice::InvoiceNumber;
pub use money::Money;
pub use roles::{Capability, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines accepted in a single checkout.
pub const MAX_CHECKOUT_LINES: usize = 100;

/// Maximum quantity of a single product in one checkout.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default page size for order listings.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Upper bound for a requested page size.
pub const MAX_PER_PAGE: u32 = 100;
