//! # emporium-api
//!
//! HTTP boundary for the storefront. Handlers translate requests into
//! `emporium-orders` calls and errors into status codes; no business rule
//! is decided here.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  public     GET    /public/shipping-zones                               │
//! │                                                                         │
//! │  customer   POST   /customer/checkout                 PlaceOrders       │
//! │             POST   /customer/checkout-and-pay                           │
//! │             GET    /customer/orders                                     │
//! │             GET    /customer/orders/{id}                                │
//! │             POST   /customer/orders/{id}/pay                            │
//! │                                                                         │
//! │  admin      GET    /admin/orders                      ManageOrders      │
//! │             PUT    /admin/orders/{id}/status                            │
//! │             POST   /admin/shipping-zones              ManageShipping-   │
//! │             PUT    /admin/shipping-zones/{id}           Zones           │
//! │             DELETE /admin/shipping-zones/{id}                           │
//! │                                                                         │
//! │  provider   POST   /payment/midtrans/callback         (enqueue only)    │
//! │                                                                         │
//! │  ops        GET    /health                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::handlers::{admin, customer, payment, zones};
pub use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let customer = Router::new()
        .route("/checkout", post(customer::checkout))
        .route("/checkout-and-pay", post(customer::checkout_and_pay))
        .route("/orders", get(customer::list_orders))
        .route("/orders/{id}", get(customer::get_order))
        .route("/orders/{id}/pay", post(customer::pay));

    let admin = Router::new()
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/status", put(admin::update_status))
        .route("/shipping-zones", post(zones::create))
        .route("/shipping-zones/{id}", put(zones::update).delete(zones::delete));

    Router::new()
        .route("/health", get(health))
        .route("/public/shipping-zones", get(zones::list))
        .route("/payment/midtrans/callback", post(payment::midtrans_callback))
        .nest("/customer", customer)
        .nest("/admin", admin)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "degraded" })))
    }
}
