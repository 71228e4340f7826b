//! # Payment Gateway Adapter
//!
//! Opens Midtrans Snap payment sessions for stored orders.
//!
//! ```text
//!   PaymentGateway::create_session(order)
//!        │
//!        ├── SnapRequest::for_order      AlreadyPaid / NotPayable / TotalMismatch
//!        │
//!        ├── SnapApi::create_transaction POST {base}/snap/v1/transactions
//!        │                               Basic auth: server_key + ""
//!        │
//!        └── orders.set_snap_token       status and payment_status untouched
//! ```
//!
//! Repeating the call for a pending order is safe; the stored token is
//! overwritten each time.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use emporium_core::snap::{CustomerDetails, SnapRequest, SnapSession};
use emporium_core::{CoreError, Order};
use emporium_db::Database;

use crate::config::MidtransSettings;
use crate::error::{GatewayError, SessionError};

/// The provider call, behind a trait so tests can stand in for Midtrans.
#[async_trait]
pub trait SnapApi: Send + Sync {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<SnapSession, GatewayError>;
}

// =============================================================================
// Midtrans HTTP client
// =============================================================================

#[derive(Debug, Deserialize)]
struct SnapErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

#[derive(Clone)]
pub struct MidtransSnapClient {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl MidtransSnapClient {
    pub fn new(settings: &MidtransSettings) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(MidtransSnapClient {
            client,
            endpoint: format!("{}/snap/v1/transactions", settings.base_url()),
            server_key: settings.server_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SnapApi for MidtransSnapClient {
    async fn create_transaction(&self, request: &SnapRequest) -> Result<SnapSession, GatewayError> {
        debug!(
            invoice = %request.transaction_details.order_id,
            gross_amount = request.transaction_details.gross_amount,
            "Requesting Snap transaction"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.server_key, Some(""))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SnapErrorBody>(&body)
                .ok()
                .filter(|b| !b.error_messages.is_empty())
                .map(|b| b.error_messages.join("; "))
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "Snap API rejected transaction");
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let session: SnapSession = response.json().await?;
        if session.token.is_empty() {
            return Err(GatewayError::InvalidResponse("empty token".to_string()));
        }
        Ok(session)
    }
}

// =============================================================================
// Gateway service
// =============================================================================

#[derive(Clone)]
pub struct PaymentGateway {
    db: Database,
    api: Arc<dyn SnapApi>,
    is_3ds: bool,
}

impl PaymentGateway {
    pub fn new(db: Database, api: Arc<dyn SnapApi>, is_3ds: bool) -> Self {
        PaymentGateway { db, api, is_3ds }
    }

    /// Loads a customer's order and opens a session for it.
    pub async fn create_session_for_user(
        &self,
        order_id: i64,
        user_id: i64,
        customer: CustomerDetails,
    ) -> Result<SnapSession, SessionError> {
        let order = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or(CoreError::OrderNotFound(order_id))?;
        self.create_session(&order, customer).await
    }

    /// Opens a session for `order` and stores the token on it.
    pub async fn create_session(&self, order: &Order, customer: CustomerDetails) -> Result<SnapSession, SessionError> {
        let request = SnapRequest::for_order(order, customer, self.is_3ds)?;
        let session = self.api.create_transaction(&request).await?;
        self.db.orders().set_snap_token(order.id, &session.token).await?;

        info!(order_id = order.id, invoice = %order.invoice_number, "Payment session created");
        Ok(session)
    }
}
