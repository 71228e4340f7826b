//! # Checkout Orchestrator
//!
//! Turns a cart into a persisted order inside one SQLite transaction.
//!
//! ## Transaction Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalize lines (merge duplicates, bounds)         no transaction yet │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. lock + load products            InventoryGuard                     │
//! │   2. price lines, sum weight         emporium_core::price_cart          │
//! │   3. quote shipping                  ShippingCalculator                 │
//! │   4. draw invoice number             InvoiceGenerator                   │
//! │   5. insert order + items                                               │
//! │   6. decrement stock                 InventoryGuard                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction, which rolls everything back.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use emporium_core::checkout::price_cart;
use emporium_core::snap::{CustomerDetails, SnapSession};
use emporium_core::validation::normalize_checkout_lines;
use emporium_core::{CheckoutLine, Order};
use emporium_db::repository::order;
use emporium_db::{Database, DbError, NewOrder};

use crate::error::{CheckoutAndPayError, CheckoutError};
use crate::gateway::PaymentGateway;
use crate::inventory;
use crate::invoice::InvoiceGenerator;
use crate::shipping::ShippingCalculator;

/// A customer's cart at the moment of checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub shipping_zone_id: i64,
    /// Taken from the authenticated identity, never from the body.
    #[serde(skip)]
    pub user_id: i64,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Database,
    shipping: ShippingCalculator,
    invoices: Arc<InvoiceGenerator>,
}

impl CheckoutService {
    pub fn new(db: Database, shipping: ShippingCalculator, invoices: Arc<InvoiceGenerator>) -> Self {
        CheckoutService { db, shipping, invoices }
    }

    /// Creates a pending, unpaid order and reserves its stock.
    ///
    /// ## Errors
    /// - `Rejected(ProductNotFound | InsufficientStock | ZoneNotFound | Validation)`
    /// - `Storage` on any database failure
    /// - `InvoiceSpaceExhausted` if no free invoice number was found
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Order, CheckoutError> {
        let lines = normalize_checkout_lines(&request.items)?;

        let mut tx = self.db.begin().await?;

        let products = inventory::lock_products(&mut tx, &lines).await?;
        let cart = price_cart(&lines, &products)?;
        let quote = self
            .shipping
            .calculate_in(&mut tx, cart.weight_grams, request.shipping_zone_id)
            .await?;

        let now = Utc::now();
        let invoice = self.invoices.generate(&mut tx, now.date_naive()).await?;

        let header = NewOrder {
            invoice_number: invoice.into_string(),
            user_id: request.user_id,
            total_price: cart.subtotal + quote.cost,
            shipping_cost: quote.cost,
            shipping_zone: quote.zone_name,
        };
        let order_id = order::insert_order(&mut *tx, &header, now).await?;
        for line in &cart.lines {
            order::insert_item(&mut *tx, order_id, line.product_id, line.quantity, line.unit_price).await?;
        }

        inventory::decrement_all(&mut tx, &cart.lines).await?;

        tx.commit().await?;

        info!(
            order_id,
            invoice = %header.invoice_number,
            user_id = request.user_id,
            total = header.total_price.minor(),
            lines = cart.lines.len(),
            "Order placed"
        );

        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id).into())
    }

    /// Checks out, then opens a payment session for the new order.
    ///
    /// The order is committed before the provider is called. If the session
    /// cannot be opened the order stays pending and can be paid later.
    pub async fn checkout_and_pay(
        &self,
        gateway: &PaymentGateway,
        request: &CheckoutRequest,
        customer: CustomerDetails,
    ) -> Result<(Order, SnapSession), CheckoutAndPayError> {
        let order = self.checkout(request).await?;

        match gateway.create_session(&order, customer).await {
            Ok(session) => Ok((order, session)),
            Err(source) => {
                warn!(
                    order_id = order.id,
                    invoice = %order.invoice_number,
                    error = %source,
                    "Order placed but payment session failed"
                );
                Err(CheckoutAndPayError::Session {
                    invoice: order.invoice_number,
                    order_id: order.id,
                    source,
                })
            }
        }
    }
}
