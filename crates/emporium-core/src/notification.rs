//! # Payment Notifications
//!
//! Parsing, authentication and the state decision for Midtrans HTTP
//! notifications. Everything here is pure; emporium-orders applies the
//! resulting [`Transition`] inside a database transaction.
//!
//! ## Reconciliation Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw JSON                                                               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  required fields present? ──no──► MissingField        (permanent)       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  SHA-512(order_id‖status_code‖gross_amount‖server_key)                  │
//! │  == signature_key?        ──no──► InvalidSignature    (permanent)       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  order already paid? ─────yes───► AlreadyPaid         (no-op)           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  transaction_status                                                     │
//! │   ├── capture + fraud accept ─┬► MarkPaid                               │
//! │   │   settlement ─────────────┘  (Reinstate if already cancelled)       │
//! │   ├── capture + other fraud ───► NoChange                               │
//! │   ├── pending ─────────────────► NoChange                               │
//! │   ├── cancel / expire / deny ──► Cancel { restore_stock }               │
//! │   └── anything else ───────────► NoChange (logged as unhandled)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::{Map, Value};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::NotificationError;
use crate::types::{OrderStatus, PaymentStatus};

/// Fields that must be present and non-empty, checked in this order.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "order_id",
    "status_code",
    "gross_amount",
    "signature_key",
    "transaction_status",
];

/// Fraud verdict assumed when a capture omits `fraud_status`.
pub const DEFAULT_FRAUD_STATUS: &str = "accept";

// =============================================================================
// Transaction Status
// =============================================================================

/// Provider-side transaction status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Cancel,
    Expire,
    Deny,
    /// Any status this service does not act on (refund, chargeback, ...).
    Other(String),
}

impl TransactionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "capture" => TransactionStatus::Capture,
            "settlement" => TransactionStatus::Settlement,
            "pending" => TransactionStatus::Pending,
            "cancel" => TransactionStatus::Cancel,
            "expire" => TransactionStatus::Expire,
            "deny" => TransactionStatus::Deny,
            other => TransactionStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Notification
// =============================================================================

/// An authenticated-or-not notification with its fields extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Our invoice number.
    pub order_id: String,
    pub status_code: String,
    /// Kept verbatim (e.g. "60000.00"); it is part of the signed string.
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: TransactionStatus,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
}

impl PaymentNotification {
    /// Parses a raw webhook body.
    pub fn from_json(body: &str) -> Result<Self, NotificationError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| NotificationError::InvalidPayload(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Extracts fields from a decoded body.
    ///
    /// Strings are taken as-is; numbers are rendered with their JSON text so
    /// the signature is computed over what the provider actually sent.
    pub fn from_value(value: &Value) -> Result<Self, NotificationError> {
        let object = value
            .as_object()
            .ok_or_else(|| NotificationError::InvalidPayload("expected an object".to_string()))?;

        for field in REQUIRED_FIELDS {
            if text_field(object, field).is_none() {
                return Err(NotificationError::MissingField(field));
            }
        }

        let required = |field: &'static str| {
            text_field(object, field).ok_or(NotificationError::MissingField(field))
        };

        Ok(PaymentNotification {
            order_id: required("order_id")?,
            status_code: required("status_code")?,
            gross_amount: required("gross_amount")?,
            signature_key: required("signature_key")?,
            transaction_status: TransactionStatus::parse(&required("transaction_status")?),
            fraud_status: text_field(object, "fraud_status"),
            payment_type: text_field(object, "payment_type"),
            transaction_id: text_field(object, "transaction_id"),
        })
    }

    /// Checks `signature_key` against the locally computed signature.
    pub fn verify_signature(&self, server_key: &str) -> Result<(), NotificationError> {
        let expected = signature(&self.order_id, &self.status_code, &self.gross_amount, server_key);
        if constant_time_eq(expected.as_bytes(), self.signature_key.as_bytes()) {
            Ok(())
        } else {
            Err(NotificationError::InvalidSignature {
                order_id: self.order_id.clone(),
            })
        }
    }

    /// What the provider is telling us, independent of local order state.
    pub fn outcome(&self) -> PaymentOutcome {
        match &self.transaction_status {
            TransactionStatus::Capture => {
                let fraud = self.fraud_status.as_deref().unwrap_or(DEFAULT_FRAUD_STATUS);
                if fraud == DEFAULT_FRAUD_STATUS {
                    PaymentOutcome::Paid
                } else {
                    PaymentOutcome::FraudHold(fraud.to_string())
                }
            }
            TransactionStatus::Settlement => PaymentOutcome::Paid,
            TransactionStatus::Pending => PaymentOutcome::Pending,
            TransactionStatus::Cancel | TransactionStatus::Expire | TransactionStatus::Deny => {
                PaymentOutcome::Cancelled
            }
            TransactionStatus::Other(status) => PaymentOutcome::Unhandled(status.clone()),
        }
    }

    /// True when the body carries payment details worth persisting.
    pub fn has_payment_details(&self) -> bool {
        self.payment_type.is_some() || self.transaction_id.is_some()
    }
}

fn text_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    match object.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lowercase hex SHA-512 of `order_id ‖ status_code ‖ gross_amount ‖ server_key`.
pub fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// Outcome and Transition
// =============================================================================

/// Provider verdict derived from a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    /// Captured but held by fraud screening (challenge, deny, ...).
    FraudHold(String),
    Pending,
    Cancelled,
    Unhandled(String),
}

/// The change to apply to a stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order is paid; nothing may change.
    AlreadyPaid,
    MarkPaid,
    /// Paid after a cancel already returned its stock; the items must be
    /// taken out of stock again as the order is marked paid.
    Reinstate,
    /// Cancel, restoring stock unless the order was already cancelled.
    Cancel { restore_stock: bool },
    NoChange,
}

/// Decides the transition for an order currently in `status`/`payment_status`.
pub fn plan_transition(
    status: OrderStatus,
    payment_status: PaymentStatus,
    outcome: &PaymentOutcome,
) -> Transition {
    if payment_status == PaymentStatus::Paid {
        return Transition::AlreadyPaid;
    }

    match outcome {
        PaymentOutcome::Paid if status == OrderStatus::Cancelled => Transition::Reinstate,
        PaymentOutcome::Paid => Transition::MarkPaid,
        PaymentOutcome::Cancelled => Transition::Cancel {
            restore_stock: status != OrderStatus::Cancelled,
        },
        PaymentOutcome::FraudHold(_) | PaymentOutcome::Pending | PaymentOutcome::Unhandled(_) => {
            Transition::NoChange
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "SB-Mid-server-test";

    fn signed(status: &str, gross: &str) -> Value {
        json!({
            "order_id": "INV-20261016-0042",
            "status_code": "200",
            "gross_amount": gross,
            "signature_key": signature("INV-20261016-0042", "200", gross, KEY),
            "transaction_status": status,
            "payment_type": "bank_transfer",
            "transaction_id": "9aed5972-5b6a-401e-894b-a32c91ed1a3a",
        })
    }

    #[test]
    fn test_signature_is_lowercase_sha512_hex() {
        let sig = signature("a", "b", "c", "d");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        // SHA-512("abcd")
        assert!(sig.starts_with("d8022f2060ad6efd297ab73dcc5355c9b214054b0d1776a136a669d26a7d3b14"));
    }

    #[test]
    fn test_valid_notification_verifies() {
        let n = PaymentNotification::from_value(&signed("settlement", "60000.00")).unwrap();
        assert!(n.verify_signature(KEY).is_ok());
        assert_eq!(n.outcome(), PaymentOutcome::Paid);
        assert!(n.has_payment_details());
    }

    #[test]
    fn test_tampered_amount_fails_signature() {
        let mut body = signed("settlement", "60000.00");
        body["gross_amount"] = json!("1.00");
        let n = PaymentNotification::from_value(&body).unwrap();
        assert!(matches!(
            n.verify_signature(KEY),
            Err(NotificationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_missing_or_empty_fields_rejected_in_order() {
        let mut body = signed("settlement", "60000.00");
        body["signature_key"] = json!("");
        body.as_object_mut().unwrap().remove("status_code");
        assert_eq!(
            PaymentNotification::from_value(&body),
            Err(NotificationError::MissingField("status_code"))
        );

        let mut body = signed("settlement", "60000.00");
        body["transaction_status"] = Value::Null;
        assert_eq!(
            PaymentNotification::from_value(&body),
            Err(NotificationError::MissingField("transaction_status"))
        );
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert!(matches!(
            PaymentNotification::from_json("[1,2]"),
            Err(NotificationError::InvalidPayload(_))
        ));
        assert!(matches!(
            PaymentNotification::from_json("not json"),
            Err(NotificationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_capture_fraud_handling() {
        let mut body = signed("capture", "60000.00");
        let n = PaymentNotification::from_value(&body).unwrap();
        assert_eq!(n.outcome(), PaymentOutcome::Paid);

        body["fraud_status"] = json!("challenge");
        let n = PaymentNotification::from_value(&body).unwrap();
        assert_eq!(n.outcome(), PaymentOutcome::FraudHold("challenge".to_string()));
    }

    #[test]
    fn test_unknown_status_is_unhandled() {
        let n = PaymentNotification::from_value(&signed("refund", "60000.00")).unwrap();
        assert_eq!(n.outcome(), PaymentOutcome::Unhandled("refund".to_string()));
    }

    #[test]
    fn test_plan_transition() {
        assert_eq!(
            plan_transition(OrderStatus::Paid, PaymentStatus::Paid, &PaymentOutcome::Cancelled),
            Transition::AlreadyPaid
        );
        assert_eq!(
            plan_transition(OrderStatus::Pending, PaymentStatus::Unpaid, &PaymentOutcome::Paid),
            Transition::MarkPaid
        );
        assert_eq!(
            plan_transition(OrderStatus::Pending, PaymentStatus::Unpaid, &PaymentOutcome::Cancelled),
            Transition::Cancel { restore_stock: true }
        );
        assert_eq!(
            plan_transition(OrderStatus::Cancelled, PaymentStatus::Unpaid, &PaymentOutcome::Cancelled),
            Transition::Cancel { restore_stock: false }
        );
        assert_eq!(
            plan_transition(OrderStatus::Pending, PaymentStatus::Unpaid, &PaymentOutcome::Pending),
            Transition::NoChange
        );
    }

    #[test]
    fn test_payment_after_cancel_reinstates() {
        assert_eq!(
            plan_transition(OrderStatus::Cancelled, PaymentStatus::Unpaid, &PaymentOutcome::Paid),
            Transition::Reinstate
        );
        assert_eq!(
            plan_transition(OrderStatus::Cancelled, PaymentStatus::Unpaid, &PaymentOutcome::Pending),
            Transition::NoChange
        );
    }
}
