//! # Domain Types
//!
//! Core domain types used throughout Emporium.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │  ShippingZone   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  invoice_number │   │  id             │       │
//! │  │  price          │◄──│  items[]        │   │  name           │       │
//! │  │  weight_grams   │   │  total_price    │   │  price_per_kg   │       │
//! │  │  stock          │   │  status         │   └─────────────────┘       │
//! │  └─────────────────┘   │  payment_status │                             │
//! │                        └─────────────────┘                             │
//! │                                                                         │
//! │  OrderStatus:   pending → paid → shipped → completed                   │
//! │                    └──────► cancelled / failed / expired               │
//! │  PaymentStatus: unpaid → paid                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Weak References
//! `OrderItem.product_id` and `Order.shipping_zone` are snapshots: the order
//! stays valid after the product or zone it was built from changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name, also used as the payment manifest line name.
    pub name: String,

    /// Unit price in the smallest currency unit.
    pub price: Money,

    /// Shipping weight of one unit. Always at least 1.
    pub weight_grams: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks the requested quantity against current stock.
    ///
    /// Only meaningful on a row read under the checkout lock.
    pub fn ensure_available(&self, requested: i64) -> CoreResult<()> {
        if self.stock < requested {
            return Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                available: self.stock,
                requested,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Shipping Zone
// =============================================================================

/// A named delivery region with a per-kilogram tariff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingZone {
    pub id: i64,
    pub name: String,
    pub price_per_kg: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Result of a shipping calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingQuote {
    /// Zone name, snapshotted onto the order.
    pub zone_name: String,
    pub weight_grams: i64,
    /// Weight rounded up to whole kilograms.
    pub billable_kg: i64,
    pub cost: Money,
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created by checkout, awaiting payment.
    #[default]
    Pending,
    Paid,
    Shipped,
    Completed,
    /// Cancelled by the provider (cancel / expire / deny); stock restored.
    Cancelled,
    Failed,
    Expired,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
        OrderStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    /// Terminal. Once paid, no notification changes the order again.
    Paid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => f.write_str("unpaid"),
            PaymentStatus::Paid => f.write_str("paid"),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order produced by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,
    /// `INV-YYYYMMDD-NNNN`, unique. Used as the provider-side order id.
    pub invoice_number: String,
    pub user_id: i64,
    /// Items subtotal plus shipping.
    pub total_price: Money,
    pub shipping_cost: Money,
    /// Zone name at checkout time.
    pub shipping_zone: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
    /// Last issued Snap session token.
    pub snap_token: Option<String>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Sum of item lines, excluding shipping.
    pub fn items_subtotal(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// A line of an order. `price` is the unit price frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Current catalog name, if the product still exists.
    pub product_name: Option<String>,
    pub quantity: i64,
    pub price: Money,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    /// Last page number, at least 1.
    pub fn last_page(&self) -> u32 {
        if self.total <= 0 || self.per_page == 0 {
            return 1;
        }
        ((self.total as u64).div_ceil(self.per_page as u64)) as u32
    }

    /// Row offset for a page request.
    pub fn offset(page: u32, per_page: u32) -> i64 {
        (page.max(1) as i64 - 1) * per_page as i64
    }
}

// =============================================================================
// Notification Queue
// =============================================================================

/// Lifecycle of a queued provider notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting for a worker (possibly after a retry delay).
    Pending,
    /// Claimed by a worker until its lease expires.
    Processing,
    /// Reconciled successfully.
    Processed,
    /// Permanently rejected (malformed, bad signature, unknown order).
    Rejected,
    /// Gave up after the maximum number of transient failures.
    Failed,
}

/// A raw notification body waiting for reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedNotification {
    pub id: String,
    /// Body exactly as received by the webhook.
    pub payload: String,
    pub status: QueueStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
