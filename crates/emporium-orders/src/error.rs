//! # Service Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Service Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  CheckoutError  │  │  SessionError   │  │    ReconcileError       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Rejected  4xx  │  │  Rejected  4xx  │  │  Malformed     drop     │ │
//! │  │  Storage   5xx  │  │  Gateway   5xx  │  │  InvalidSig    drop     │ │
//! │  │  Invoice...     │  │  Storage   5xx  │  │  OrderNotFound drop     │ │
//! │  └─────────────────┘  └─────────────────┘  │  Storage       retry    │ │
//! │                                            └─────────────────────────┘ │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  GatewayError   │  │  ConfigError    │  │    WorkerError          │ │
//! │  │  Transport      │  │  InvalidConfig  │  │  ChannelClosed          │ │
//! │  │  Provider       │  │  InvalidUrl     │  │                         │ │
//! │  │  InvalidResponse│  │  LoadFailed     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use emporium_core::{CoreError, NotificationError, ValidationError};
use emporium_db::DbError;

// =============================================================================
// Checkout
// =============================================================================

/// Failure of a checkout. Nothing is persisted in any case.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Client-correctable rejection (unknown product or zone, stock, input).
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// Storage failure; the transaction was rolled back.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// Every invoice suffix for the day was tried without finding a free one.
    #[error("No free invoice number left for {date}")]
    InvoiceSpaceExhausted { date: String },
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Rejected(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutError::Storage(err.into())
    }
}

// =============================================================================
// Payment Sessions
// =============================================================================

/// Failure talking to the payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network, TLS or timeout error before a response arrived.
    #[error("Payment provider unreachable: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Payment provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider answered 2xx with a body we cannot use.
    #[error("Unexpected payment provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Failure of `create_session`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// AlreadyPaid, NotPayable, TotalMismatch, OrderNotFound.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

/// Failure of the combined checkout-then-pay flow.
#[derive(Debug, Error)]
pub enum CheckoutAndPayError {
    /// Checkout failed; no order exists.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The order was created but no session could be opened.
    /// It stays pending and can be paid later.
    #[error("Order {invoice} was created but payment could not be started: {source}")]
    Session {
        invoice: String,
        order_id: i64,
        #[source]
        source: SessionError,
    },
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Failure to reconcile one provider notification.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Not a JSON object, or a required field is missing.
    #[error("Malformed notification: {0}")]
    Malformed(NotificationError),

    /// Signature mismatch. Never applied.
    #[error("Invalid signature for order {order_id}")]
    InvalidSignature { order_id: String },

    /// No order carries this invoice number.
    #[error("Order not found for invoice {invoice}")]
    OrderNotFound { invoice: String },

    /// Storage unavailable or failing; safe to redeliver.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl ReconcileError {
    /// Permanent errors are dropped; redelivering the same payload cannot help.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ReconcileError::Storage(_))
    }
}

impl From<NotificationError> for ReconcileError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidSignature { order_id } => {
                ReconcileError::InvalidSignature { order_id }
            }
            other => ReconcileError::Malformed(other),
        }
    }
}

impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        ReconcileError::Storage(err.into())
    }
}

// =============================================================================
// Worker
// =============================================================================

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker task has already stopped.
    #[error("Worker channel closed: {0}")]
    ChannelClosed(String),
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidUrl(err.to_string())
    }
}
