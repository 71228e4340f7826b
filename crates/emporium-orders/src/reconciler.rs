//! # Notification Reconciler
//!
//! Applies one provider notification to its order. Safe under duplicate,
//! replayed and out-of-order delivery.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw payload                                                            │
//! │    │ parse            missing field / not JSON ─────► Malformed   (drop)│
//! │    │ verify SHA-512   mismatch ─────────────────────► InvalidSig  (drop)│
//! │    │ load by invoice  unknown ──────────────────────► NotFound    (drop)│
//! │    │ already paid? ─────────────────────────────────► AlreadyPaid (ok)  │
//! │    ▼                                                                    │
//! │  BEGIN                                                                  │
//! │    record payment_type / transaction_id (COALESCE)                      │
//! │    capture+accept, settlement ─► mark_paid     (CAS on payment_status)  │
//! │      order was cancelled ──────► mark_paid, then retake every item      │
//! │    cancel, expire, deny ───────► mark_cancelled (CAS on status)         │
//! │                                   └─ CAS won ─► restore every item      │
//! │    pending, fraud hold, other ─► no change                              │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Storage errors anywhere ─────────────────────────► Storage     (retry) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};

use emporium_core::notification::{plan_transition, PaymentNotification, PaymentOutcome, Transition};
use emporium_core::Order;
use emporium_db::repository::order;
use emporium_db::Database;

use crate::error::ReconcileError;
use crate::inventory;

/// Net effect of one reconciled notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was paid before this notification; nothing changed.
    AlreadyPaid,
    MarkedPaid,
    /// Paid after a cancel; stock taken again for every item the guard
    /// allowed. `short_items` counts the ones it refused.
    Reinstated { short_items: usize },
    /// Cancelled by this notification; stock returned for every item.
    Cancelled { restored_items: usize },
    /// Pending, fraud hold, unhandled status, or already cancelled.
    NoChange,
}

#[derive(Clone)]
pub struct NotificationReconciler {
    db: Database,
    server_key: String,
}

impl NotificationReconciler {
    pub fn new(db: Database, server_key: impl Into<String>) -> Self {
        NotificationReconciler {
            db,
            server_key: server_key.into(),
        }
    }

    /// Parses, authenticates and applies a raw webhook body.
    pub async fn reconcile(&self, payload: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let notification = PaymentNotification::from_json(payload)?;
        notification.verify_signature(&self.server_key)?;
        self.apply(&notification).await
    }

    /// Applies an already authenticated notification.
    pub async fn apply(&self, notification: &PaymentNotification) -> Result<ReconcileOutcome, ReconcileError> {
        let invoice = notification.order_id.as_str();
        let order = self
            .db
            .orders()
            .get_by_invoice(invoice)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound {
                invoice: invoice.to_string(),
            })?;

        let outcome = notification.outcome();
        let transition = plan_transition(order.status, order.payment_status, &outcome);
        debug!(
            order_id = order.id,
            invoice,
            transaction_status = notification.transaction_status.as_str(),
            ?transition,
            "Reconciling notification"
        );

        if transition == Transition::AlreadyPaid {
            info!(order_id = order.id, invoice, "Order already paid, notification ignored");
            return Ok(ReconcileOutcome::AlreadyPaid);
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        if notification.has_payment_details() {
            order::record_payment_details(
                &mut *tx,
                order.id,
                notification.payment_type.as_deref(),
                notification.transaction_id.as_deref(),
                now,
            )
            .await?;
        }

        let result = match transition {
            Transition::AlreadyPaid => ReconcileOutcome::AlreadyPaid,
            Transition::MarkPaid => {
                if order::mark_paid(&mut *tx, order.id, now).await? {
                    info!(order_id = order.id, invoice, "Order marked paid");
                    ReconcileOutcome::MarkedPaid
                } else {
                    info!(order_id = order.id, invoice, "Order paid concurrently, notification ignored");
                    ReconcileOutcome::AlreadyPaid
                }
            }
            Transition::Reinstate => self.reinstate(&mut tx, &order, now).await?,
            Transition::Cancel { restore_stock: true } => self.cancel(&mut tx, &order, now).await?,
            Transition::Cancel { restore_stock: false } => {
                debug!(order_id = order.id, invoice, "Order already cancelled");
                ReconcileOutcome::NoChange
            }
            Transition::NoChange => {
                log_no_change(&order, &outcome);
                ReconcileOutcome::NoChange
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn reinstate(
        &self,
        conn: &mut sqlx::SqliteConnection,
        order: &Order,
        now: chrono::DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if !order::mark_paid(&mut *conn, order.id, now).await? {
            info!(order_id = order.id, "Order paid concurrently, notification ignored");
            return Ok(ReconcileOutcome::AlreadyPaid);
        }

        let mut short_items = 0;
        for item in &order.items {
            if !inventory::retake(&mut *conn, item.product_id, item.quantity).await? {
                short_items += 1;
            }
        }

        if short_items > 0 {
            warn!(
                order_id = order.id,
                invoice = %order.invoice_number,
                short_items,
                "Cancelled order paid, stock could not cover every item"
            );
        } else {
            info!(
                order_id = order.id,
                invoice = %order.invoice_number,
                "Cancelled order paid, stock taken again"
            );
        }
        Ok(ReconcileOutcome::Reinstated { short_items })
    }

    async fn cancel(
        &self,
        conn: &mut sqlx::SqliteConnection,
        order: &Order,
        now: chrono::DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if !order::mark_cancelled(&mut *conn, order.id, now).await? {
            debug!(order_id = order.id, "Cancel lost the race, stock left as is");
            return Ok(ReconcileOutcome::NoChange);
        }

        for item in &order.items {
            inventory::restore(&mut *conn, item.product_id, item.quantity).await?;
        }

        info!(
            order_id = order.id,
            invoice = %order.invoice_number,
            items = order.items.len(),
            "Order cancelled, stock restored"
        );
        Ok(ReconcileOutcome::Cancelled {
            restored_items: order.items.len(),
        })
    }
}

fn log_no_change(order: &Order, outcome: &PaymentOutcome) {
    match outcome {
        PaymentOutcome::Pending => {
            info!(order_id = order.id, invoice = %order.invoice_number, "Payment pending");
        }
        PaymentOutcome::FraudHold(fraud_status) => {
            info!(
                order_id = order.id,
                invoice = %order.invoice_number,
                %fraud_status,
                "Capture held by fraud screening"
            );
        }
        PaymentOutcome::Unhandled(status) => {
            warn!(
                order_id = order.id,
                invoice = %order.invoice_number,
                transaction_status = %status,
                "Unhandled transaction status"
            );
        }
        PaymentOutcome::Paid | PaymentOutcome::Cancelled => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::checkout::{CheckoutRequest, CheckoutService};
    use crate::invoice::InvoiceGenerator;
    use crate::shipping::ShippingCalculator;
    use emporium_core::notification::signature;
    use emporium_core::{CheckoutLine, OrderStatus, PaymentStatus};
    use emporium_core::Money;
    use emporium_db::{DbConfig, NewProduct};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    const KEY: &str = "SB-Mid-server-test";

    struct Fixture {
        db: Database,
        reconciler: NotificationReconciler,
        product_id: i64,
        order: Order,
    }

    /// Product 1 at 25.000 / 350 g / stock 100, zone at 10.000 per kg,
    /// and a checkout of two units by user 7.
    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shipping = ShippingCalculator::new(db.clone(), Arc::new(MemoryCache::new()), Duration::from_secs(60));
        let zone = shipping.create_zone("Jawa", 10_000).await.unwrap();
        let product_id = db
            .products()
            .insert(&NewProduct {
                name: "Nasi Goreng Spesial".to_string(),
                price: Money::from_minor(25_000),
                weight_grams: 350,
                stock: 100,
            })
            .await
            .unwrap()
            .id;

        let checkout = CheckoutService::new(db.clone(), shipping, Arc::new(InvoiceGenerator::new()));
        let order = checkout
            .checkout(&CheckoutRequest {
                items: vec![CheckoutLine { product_id, quantity: 2 }],
                shipping_zone_id: zone.id,
                user_id: 7,
            })
            .await
            .unwrap();

        Fixture {
            reconciler: NotificationReconciler::new(db.clone(), KEY),
            db,
            product_id,
            order,
        }
    }

    fn notification(invoice: &str, status: &str, extra: Value) -> String {
        let gross = "60000.00";
        let mut body = json!({
            "order_id": invoice,
            "status_code": "200",
            "gross_amount": gross,
            "signature_key": signature(invoice, "200", gross, KEY),
            "transaction_status": status,
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        body.to_string()
    }

    impl Fixture {
        async fn order(&self) -> Order {
            self.db.orders().get_by_id(self.order.id).await.unwrap().unwrap()
        }

        async fn stock(&self) -> i64 {
            self.db.products().get_by_id(self.product_id).await.unwrap().unwrap().stock
        }
    }

    #[tokio::test]
    async fn test_checkout_then_cancel_restores_stock() {
        let f = fixture().await;
        assert_eq!(f.order.total_price.minor(), 60_000);
        assert_eq!(f.stock().await, 98);

        let outcome = f
            .reconciler
            .reconcile(&notification(&f.order.invoice_number, "cancel", json!({})))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Cancelled { restored_items: 1 });

        let order = f.order().await;
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(f.stock().await, 100);
    }

    #[tokio::test]
    async fn test_settlement_is_idempotent() {
        let f = fixture().await;
        let body = notification(
            &f.order.invoice_number,
            "settlement",
            json!({ "payment_type": "bank_transfer", "transaction_id": "tx-42" }),
        );

        assert_eq!(f.reconciler.reconcile(&body).await.unwrap(), ReconcileOutcome::MarkedPaid);
        let first = f.order().await;
        assert_eq!(first.status, OrderStatus::Paid);
        assert_eq!(first.payment_status, PaymentStatus::Paid);
        assert_eq!(first.payment_type.as_deref(), Some("bank_transfer"));
        assert!(first.paid_at.is_some());

        for _ in 0..3 {
            assert_eq!(f.reconciler.reconcile(&body).await.unwrap(), ReconcileOutcome::AlreadyPaid);
        }
        assert_eq!(f.order().await.paid_at, first.paid_at);
    }

    #[tokio::test]
    async fn test_duplicate_expire_restores_once() {
        let f = fixture().await;
        let body = notification(&f.order.invoice_number, "expire", json!({}));

        f.reconciler.reconcile(&body).await.unwrap();
        assert_eq!(f.stock().await, 100);

        assert_eq!(f.reconciler.reconcile(&body).await.unwrap(), ReconcileOutcome::NoChange);
        assert_eq!(f.stock().await, 100);
    }

    #[tokio::test]
    async fn test_tampered_amount_is_inert() {
        let f = fixture().await;
        let mut body: Value =
            serde_json::from_str(&notification(&f.order.invoice_number, "settlement", json!({}))).unwrap();
        body["gross_amount"] = json!("1.00");

        let err = f.reconciler.reconcile(&body.to_string()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidSignature { .. }));
        assert!(err.is_permanent());

        let order = f.order().await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert!(order.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_permanent_rejections() {
        let f = fixture().await;

        let err = f.reconciler.reconcile("not json").await.unwrap_err();
        assert!(matches!(err, ReconcileError::Malformed(_)));

        let err = f
            .reconciler
            .reconcile(r#"{"order_id":"INV-20261016-0001","status_code":"200"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Malformed(_)));

        let err = f
            .reconciler
            .reconcile(&notification("INV-19990101-0001", "settlement", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::OrderNotFound { .. }));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_capture_respects_fraud_status() {
        let f = fixture().await;
        let invoice = f.order.invoice_number.clone();

        let held = notification(&invoice, "capture", json!({ "fraud_status": "challenge" }));
        assert_eq!(f.reconciler.reconcile(&held).await.unwrap(), ReconcileOutcome::NoChange);
        assert_eq!(f.order().await.status, OrderStatus::Pending);

        // Missing fraud_status counts as accept.
        let accepted = notification(&invoice, "capture", json!({ "payment_type": "credit_card" }));
        assert_eq!(f.reconciler.reconcile(&accepted).await.unwrap(), ReconcileOutcome::MarkedPaid);
    }

    #[tokio::test]
    async fn test_pending_and_unknown_statuses_only_record_details() {
        let f = fixture().await;
        let invoice = f.order.invoice_number.clone();

        let pending = notification(&invoice, "pending", json!({ "payment_type": "qris" }));
        assert_eq!(f.reconciler.reconcile(&pending).await.unwrap(), ReconcileOutcome::NoChange);

        let refund = notification(&invoice, "refund", json!({}));
        assert_eq!(f.reconciler.reconcile(&refund).await.unwrap(), ReconcileOutcome::NoChange);

        let order = f.order().await;
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_type.as_deref(), Some("qris"));
        assert_eq!(f.stock().await, 98);
    }

    #[tokio::test]
    async fn test_cancel_after_payment_keeps_stock_sold() {
        let f = fixture().await;
        let invoice = f.order.invoice_number.clone();

        f.reconciler
            .reconcile(&notification(&invoice, "settlement", json!({})))
            .await
            .unwrap();
        let outcome = f
            .reconciler
            .reconcile(&notification(&invoice, "deny", json!({})))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyPaid);
        assert_eq!(f.order().await.status, OrderStatus::Paid);
        assert_eq!(f.stock().await, 98);
    }

    #[tokio::test]
    async fn test_settlement_after_expire_takes_stock_again() {
        let f = fixture().await;
        let invoice = f.order.invoice_number.clone();

        f.reconciler
            .reconcile(&notification(&invoice, "expire", json!({})))
            .await
            .unwrap();
        assert_eq!(f.stock().await, 100);

        let settlement = notification(&invoice, "settlement", json!({}));
        let outcome = f.reconciler.reconcile(&settlement).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Reinstated { short_items: 0 });

        let order = f.order().await;
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(f.stock().await, 98);

        // A replay must not take the units twice.
        assert_eq!(f.reconciler.reconcile(&settlement).await.unwrap(), ReconcileOutcome::AlreadyPaid);
        assert_eq!(f.stock().await, 98);
    }

    #[tokio::test]
    async fn test_late_settlement_with_stock_gone_still_pays() {
        let f = fixture().await;
        let invoice = f.order.invoice_number.clone();

        f.reconciler
            .reconcile(&notification(&invoice, "cancel", json!({})))
            .await
            .unwrap();

        // Another buyer takes everything that was restored.
        let mut tx = f.db.begin().await.unwrap();
        assert!(emporium_db::repository::product::decrement_stock(&mut *tx, f.product_id, 100)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let outcome = f
            .reconciler
            .reconcile(&notification(&invoice, "settlement", json!({})))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Reinstated { short_items: 1 });
        assert_eq!(f.order().await.payment_status, PaymentStatus::Paid);
        assert_eq!(f.stock().await, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_transient() {
        let f = fixture().await;
        f.db.close().await;

        let err = f
            .reconciler
            .reconcile(&notification(&f.order.invoice_number, "settlement", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Storage(_)));
        assert!(!err.is_permanent());
    }
}
