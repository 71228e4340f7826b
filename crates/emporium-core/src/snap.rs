//! # Snap Transaction Request
//!
//! The manifest sent to the Midtrans Snap API when opening a payment
//! session. Built from a stored order; never from request input.
//!
//! ```text
//! {
//!   "transaction_details": { "order_id": "INV-20261016-0042", "gross_amount": 60000 },
//!   "item_details": [
//!     { "id": "1",        "price": 25000, "quantity": 2, "name": "Kaos Polos" },
//!     { "id": "SHIPPING", "price": 10000, "quantity": 1, "name": "Shipping - Jawa" }
//!   ],
//!   "customer_details": { "first_name": "Budi", "email": "budi@example.com" },
//!   "credit_card": { "secure": true }
//! }
//! ```
//!
//! The provider rejects manifests whose item lines do not sum to
//! `gross_amount`, so the builder checks that before anything is sent.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Order, OrderStatus};

/// Provider limit on item names.
pub const ITEM_NAME_MAX_CHARS: usize = 50;
/// Zone names are cut so "Shipping - " + zone stays within the item name limit.
pub const SHIPPING_ZONE_MAX_CHARS: usize = 35;
pub const SHIPPING_ITEM_ID: &str = "SHIPPING";

const FALLBACK_ITEM_NAME: &str = "Product";
const FALLBACK_CUSTOMER_NAME: &str = "Customer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapRequest {
    pub transaction_details: TransactionDetails,
    pub item_details: Vec<ItemDetail>,
    pub customer_details: CustomerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CreditCardOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    /// The invoice number.
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub id: String,
    pub price: i64,
    pub quantity: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
}

impl CustomerDetails {
    /// Fills missing profile fields with the provider-accepted defaults.
    pub fn new(name: Option<&str>, email: Option<&str>) -> Self {
        let first_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_CUSTOMER_NAME);
        CustomerDetails {
            first_name: first_name.to_string(),
            email: email.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardOptions {
    pub secure: bool,
}

/// Session returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

impl SnapRequest {
    /// Builds the manifest for `order`.
    ///
    /// ## Errors
    /// - `AlreadyPaid` when the order's payment status is paid
    /// - `NotPayable` when the order is not pending
    /// - `TotalMismatch` when item lines plus shipping differ from the stored total
    pub fn for_order(order: &Order, customer: CustomerDetails, is_3ds: bool) -> CoreResult<Self> {
        ensure_payable(order)?;

        let mut item_details: Vec<ItemDetail> = order
            .items
            .iter()
            .map(|item| ItemDetail {
                id: item.product_id.to_string(),
                price: item.price.minor(),
                quantity: item.quantity,
                name: truncate_chars(
                    item.product_name.as_deref().unwrap_or(FALLBACK_ITEM_NAME),
                    ITEM_NAME_MAX_CHARS,
                ),
            })
            .collect();

        if order.shipping_cost.is_positive() {
            item_details.push(ItemDetail {
                id: SHIPPING_ITEM_ID.to_string(),
                price: order.shipping_cost.minor(),
                quantity: 1,
                name: format!(
                    "Shipping - {}",
                    truncate_chars(&order.shipping_zone, SHIPPING_ZONE_MAX_CHARS)
                ),
            });
        }

        let request = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: order.invoice_number.clone(),
                gross_amount: order.total_price.minor(),
            },
            item_details,
            customer_details: customer,
            credit_card: is_3ds.then_some(CreditCardOptions { secure: true }),
        };

        let manifest = request.manifest_total();
        if manifest != order.total_price {
            return Err(CoreError::TotalMismatch {
                invoice: order.invoice_number.clone(),
                expected: order.total_price,
                manifest,
            });
        }

        Ok(request)
    }

    /// Sum of `price × quantity` over every item line.
    pub fn manifest_total(&self) -> Money {
        self.item_details
            .iter()
            .map(|item| Money::from_minor(item.price).multiply_quantity(item.quantity))
            .sum()
    }
}

/// Rejects orders that are paid or no longer pending.
pub fn ensure_payable(order: &Order) -> CoreResult<()> {
    if order.is_paid() {
        return Err(CoreError::AlreadyPaid {
            invoice: order.invoice_number.clone(),
        });
    }
    if order.status != OrderStatus::Pending {
        return Err(CoreError::NotPayable {
            invoice: order.invoice_number.clone(),
            status: order.status,
        });
    }
    Ok(())
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
