//! Back-office order endpoints (`ManageOrders`).

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use emporium_core::validation::normalize_pagination;
use emporium_core::{Capability, CoreError, Order, OrderStatus};

use super::{ApiJson, ApiResult, Envelope, PageBody};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// `GET /admin/orders?status&page&per_page`, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Envelope<PageBody<Order>>> {
    user.require(Capability::ManageOrders)?;

    let status = match filter.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<OrderStatus>()?),
    };
    let (page, per_page) = normalize_pagination(filter.page, filter.per_page);

    let orders = state.db.orders().list(status, page, per_page).await?;
    Ok(Envelope::ok("Orders retrieved", orders.into()))
}

/// `PUT /admin/orders/{id}/status`. Changes the fulfilment status only;
/// payment status and stock are left alone.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Envelope<Order>> {
    user.require(Capability::ManageOrders)?;
    let status: OrderStatus = body.status.trim().parse()?;

    let order = state
        .db
        .orders()
        .update_status(order_id, status)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::from(CoreError::OrderNotFound(order_id))
            } else {
                e.into()
            }
        })?;

    tracing::info!(order_id, %status, admin_id = user.user_id, "Order status updated");
    Ok(Envelope::ok("Order status updated", order))
}
