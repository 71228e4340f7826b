//! Midtrans payment notification webhook.
//!
//! ```text
//!  Midtrans ── POST /payment/midtrans/callback ──► payment_notifications
//!                         │                         (payload verbatim)
//!                         ├── worker.wake()
//!                         ▼
//!                   200 {"success":true}
//! ```
//!
//! Nothing is parsed or verified here. A malformed or forged body is still
//! accepted and left for the worker to reject. Only bodies that are not
//! UTF-8, and so cannot be stored verbatim, are refused here.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ApiResult;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn midtrans_callback(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let payload = std::str::from_utf8(&body).map_err(|e| {
        warn!(bytes = body.len(), error = %e, "Payment notification is not UTF-8");
        ApiError::validation("Notification body must be UTF-8")
    })?;
    let queued = state.db.notifications().enqueue(payload).await?;
    state.worker.wake();

    debug!(id = %queued.id, bytes = body.len(), "Payment notification queued");
    Ok(Json(json!({ "success": true })))
}
