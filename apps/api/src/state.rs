//! Shared application state.

use std::sync::Arc;

use emporium_db::Database;
use emporium_orders::{CheckoutService, NotificationWorkerHandle, PaymentGateway, ShippingCalculator};

use crate::auth::JwtManager;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub checkout: CheckoutService,
    pub gateway: PaymentGateway,
    pub shipping: ShippingCalculator,
    pub jwt: Arc<JwtManager>,
    /// Woken after every webhook insert.
    pub worker: NotificationWorkerHandle,
}
