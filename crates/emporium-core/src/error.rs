//! # Error Types
//!
//! Domain-specific error types for emporium-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  emporium-core errors (this file)                                       │
//! │  ├── CoreError          - Business rule violations (checkout, payment)  │
//! │  ├── ValidationError    - Input validation failures                     │
//! │  └── NotificationError  - Provider notification rejected (permanent)    │
//! │                                                                         │
//! │  emporium-db errors (separate crate)                                    │
//! │  └── DbError            - Database operation failures (transient)       │
//! │                                                                         │
//! │  emporium-orders errors                                                 │
//! │  └── CheckoutError / SessionError / ReconcileError                      │
//! │                                                                         │
//! │  apps/api                                                               │
//! │  └── ApiError           - What HTTP clients see                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is a client-visible rejection: retrying the same request
/// without changing it yields the same error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A checkout line references a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Insufficient stock to fulfil a checkout line.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (Kaos Polos × 5)
    ///      │
    ///      ▼
    /// Locked row: stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Kaos Polos", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// 422, nothing persisted
    /// ```
    #[error("Insufficient stock for product '{product}'. Available: {available}, requested: {requested}.")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The selected shipping zone does not exist.
    #[error("Shipping zone not found: {0}")]
    ZoneNotFound(i64),

    /// Order lookup failed (wrong id or not owned by the caller).
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    /// A payment session was requested for an order that is already paid.
    #[error("Order {invoice} has already been paid")]
    AlreadyPaid { invoice: String },

    /// A payment session was requested for an order that is not pending.
    #[error("Order {invoice} is {status} and cannot be paid")]
    NotPayable {
        invoice: String,
        status: OrderStatus,
    },

    /// The payment manifest does not add up to the stored order total.
    #[error("Order {invoice} manifest totals {manifest} but order total is {expected}")]
    TotalMismatch {
        invoice: String,
        expected: Money,
        manifest: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the edge, before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed invoice number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Notification Error
// =============================================================================

/// Reasons an inbound provider notification is rejected outright.
///
/// All of these are permanent: redelivering the same payload cannot succeed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// A required field is absent, null or an empty string.
    #[error("Notification is missing required field '{0}'")]
    MissingField(&'static str),

    /// The body is not a JSON object.
    #[error("Notification payload is not a JSON object: {0}")]
    InvalidPayload(String),

    /// The signature does not match the one computed with the server key.
    #[error("Invalid signature for order {order_id}")]
    InvalidSignature { order_id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product: "Kaos Polos".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product 'Kaos Polos'. Available: 3, requested: 5."
        );
    }

    #[test]
    fn test_not_payable_message_uses_status_name() {
        let err = CoreError::NotPayable {
            invoice: "INV-20260101-0001".to_string(),
            status: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Order INV-20260101-0001 is cancelled and cannot be paid"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
