//! # API Error Type
//!
//! What HTTP clients see when a request fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Handler ── Result<_, ApiError> ──► IntoResponse                        │
//! │                                                                         │
//! │  CoreError::InsufficientStock ──► 422 INSUFFICIENT_STOCK                │
//! │  CoreError::Validation        ──► 422 VALIDATION_ERROR                  │
//! │  CoreError::OrderNotFound     ──► 404 NOT_FOUND                         │
//! │  other CoreError              ──► 422 BUSINESS_LOGIC                    │
//! │  GatewayError                 ──► 500 PAYMENT_ERROR                     │
//! │  DbError                      ──► 500 DATABASE_ERROR (details logged)   │
//! │  missing / bad token          ──► 401 UNAUTHORIZED                      │
//! │  missing capability           ──► 403 FORBIDDEN                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Body
//! ```json
//! {
//!   "success": false,
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for product 'Kaos Polos'. Available: 3, requested: 5.",
//!   "data": null
//! }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use emporium_core::{CoreError, ValidationError};
use emporium_db::DbError;
use emporium_orders::{CheckoutAndPayError, CheckoutError, GatewayError, SessionError, ZoneAdminError};

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Authenticated but lacking the capability (403)
    Forbidden,

    /// Resource not found (404)
    NotFound,

    /// Input validation failed (422)
    ValidationError,

    /// Insufficient stock (422)
    InsufficientStock,

    /// Business rule rejected the request (422)
    BusinessLogic,

    /// Payment provider failed (500)
    PaymentError,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::InsufficientStock | ErrorCode::BusinessLogic => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::PaymentError | ErrorCode::DatabaseError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Extra context for the client, e.g. the order that was created
    /// before payment failed.
    pub data: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: ErrorCode,
    message: &'a str,
    data: &'a Option<Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code,
            message: &self.message,
            data: &self.data,
        };
        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::TotalMismatch { .. } => {
                error!(error = %err, "Stored order total disagrees with its items");
                return ApiError::internal("Order total could not be verified");
            }
            CoreError::OrderNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::ProductNotFound(_)
            | CoreError::ZoneNotFound(_)
            | CoreError::AlreadyPaid { .. }
            | CoreError::NotPayable { .. } => ErrorCode::BusinessLogic,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            other => {
                error!(error = %other, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        error!(error = %err, "Payment provider call failed");
        ApiError::new(ErrorCode::PaymentError, format!("Failed to start payment: {}", err))
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Rejected(core) => core.into(),
            CheckoutError::Storage(db) => db.into(),
            CheckoutError::InvoiceSpaceExhausted { date } => {
                error!(%date, "Invoice numbers exhausted");
                ApiError::internal("Could not allocate an invoice number, please retry")
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Rejected(core) => core.into(),
            SessionError::Gateway(gateway) => gateway.into(),
            SessionError::Storage(db) => db.into(),
        }
    }
}

impl From<CheckoutAndPayError> for ApiError {
    fn from(err: CheckoutAndPayError) -> Self {
        match err {
            CheckoutAndPayError::Checkout(checkout) => checkout.into(),
            CheckoutAndPayError::Session {
                invoice,
                order_id,
                source,
            } => {
                let mut api: ApiError = source.into();
                api.message = format!("Order {} was created but payment could not be started: {}", invoice, api.message);
                api.with_data(serde_json::json!({
                    "order_id": order_id,
                    "invoice_number": invoice,
                }))
            }
        }
    }
}

impl From<ZoneAdminError> for ApiError {
    fn from(err: ZoneAdminError) -> Self {
        match err {
            ZoneAdminError::Rejected(CoreError::ZoneNotFound(id)) => {
                ApiError::new(ErrorCode::NotFound, format!("Shipping zone not found: {}", id))
            }
            ZoneAdminError::Rejected(core) => core.into(),
            ZoneAdminError::Storage(db) if db.is_unique_violation() => {
                ApiError::validation("A shipping zone with this name already exists")
            }
            ZoneAdminError::Storage(db) => db.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_core::{Money, OrderStatus};

    #[test]
    fn test_core_error_statuses() {
        let stock: ApiError = CoreError::InsufficientStock {
            product: "Kaos Polos".into(),
            available: 3,
            requested: 5,
        }
        .into();
        assert_eq!(stock.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(stock.code, ErrorCode::InsufficientStock);
        assert!(stock.message.contains("Available: 3"));

        let missing: ApiError = CoreError::OrderNotFound(4).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let cancelled: ApiError = CoreError::NotPayable {
            invoice: "INV-20261016-0001".into(),
            status: OrderStatus::Cancelled,
        }
        .into();
        assert_eq!(cancelled.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let mismatch: ApiError = CoreError::TotalMismatch {
            invoice: "INV-20261016-0001".into(),
            expected: Money::from_minor(60_000),
            manifest: Money::from_minor(59_000),
        }
        .into();
        assert_eq!(mismatch.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mismatch.code, ErrorCode::Internal);
        assert_eq!(mismatch.message, "Order total could not be verified");
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err: ApiError = CheckoutError::Storage(DbError::QueryFailed("disk I/O error at page 7".into())).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_failed_payment_after_checkout_carries_order() {
        let err: ApiError = CheckoutAndPayError::Session {
            invoice: "INV-20261016-0042".into(),
            order_id: 42,
            source: SessionError::Gateway(GatewayError::Provider {
                status: 401,
                message: "Access denied".into(),
            }),
        }
        .into();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert!(err.message.starts_with("Order INV-20261016-0042 was created"));
        assert_eq!(err.data.unwrap()["order_id"], 42);
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
