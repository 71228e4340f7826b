//! Customer endpoints.
//!
//! ```text
//! POST /customer/checkout                 201  Order
//! POST /customer/checkout-and-pay         201  { order, snap_token, redirect_url }
//! GET  /customer/orders?page&per_page     200  PageBody<Order>
//! GET  /customer/orders/{id}              200  Order
//! POST /customer/orders/{id}/pay          200  { snap_token, redirect_url }
//! ```
//!
//! Every route requires `PlaceOrders`. The user id always comes from the
//! token; a body cannot act on someone else's orders.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use tracing::info;

use emporium_core::validation::normalize_pagination;
use emporium_core::{Capability, CoreError, Order};
use emporium_orders::CheckoutRequest;

use super::{ApiJson, ApiResult, Envelope, PageBody, PageParams};
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentSessionBody {
    pub snap_token: String,
    pub redirect_url: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutAndPayBody {
    pub order: Order,
    pub snap_token: String,
    pub redirect_url: String,
}

pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut request): ApiJson<CheckoutRequest>,
) -> ApiResult<Response> {
    user.require(Capability::PlaceOrders)?;
    request.user_id = user.user_id;

    let order = state.checkout.checkout(&request).await?;
    Ok(Envelope::ok("Order created", order).with_status(StatusCode::CREATED))
}

pub async fn checkout_and_pay(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut request): ApiJson<CheckoutRequest>,
) -> ApiResult<Response> {
    user.require(Capability::PlaceOrders)?;
    request.user_id = user.user_id;

    let (order, session) = state
        .checkout
        .checkout_and_pay(&state.gateway, &request, user.customer_details())
        .await?;

    let body = CheckoutAndPayBody {
        order,
        snap_token: session.token,
        redirect_url: session.redirect_url,
    };
    Ok(Envelope::ok("Order created, continue to payment", body).with_status(StatusCode::CREATED))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Envelope<PageBody<Order>>> {
    user.require(Capability::PlaceOrders)?;
    let (page, per_page) = normalize_pagination(params.page, params.per_page);

    let orders = state.db.orders().list_for_user(user.user_id, page, per_page).await?;
    Ok(Envelope::ok("Orders retrieved", orders.into()))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> ApiResult<Envelope<Order>> {
    user.require(Capability::PlaceOrders)?;

    let order = state
        .db
        .orders()
        .get_for_user(order_id, user.user_id)
        .await?
        .ok_or(CoreError::OrderNotFound(order_id))?;
    Ok(Envelope::ok("Order retrieved", order))
}

pub async fn pay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> ApiResult<Envelope<PaymentSessionBody>> {
    user.require(Capability::PlaceOrders)?;

    let session = state
        .gateway
        .create_session_for_user(order_id, user.user_id, user.customer_details())
        .await?;

    info!(order_id, user_id = user.user_id, "Payment session issued");
    Ok(Envelope::ok(
        "Payment session created",
        PaymentSessionBody {
            snap_token: session.token,
            redirect_url: session.redirect_url,
        },
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use emporium_core::Role;

    use crate::state::test_support::TestApp;

    #[tokio::test]
    async fn test_checkout_creates_order() {
        let app = TestApp::new().await;
        let kaos = app.product("Kaos Polos", 25_000, 250, 100).await;
        let jawa = app.zone("Jawa", 10_000).await;
        let token = app.token(7, Role::Customer);

        let (status, body) = app
            .send(
                Method::POST,
                "/customer/checkout",
                Some(&token),
                Some(json!({ "items": [{ "product_id": kaos.id, "quantity": 2 }], "shipping_zone_id": jawa })),
            )
            .await;

        assert_eq!(status, 201);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["total_price"], 60_000);
        assert_eq!(body["data"]["shipping_cost"], 10_000);
        assert_eq!(body["data"]["user_id"], 7);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["payment_status"], "unpaid");

        let stock = app.state.db.products().get_by_id(kaos.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 98);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_itemized_422() {
        let app = TestApp::new().await;
        let kaos = app.product("Kaos Polos", 25_000, 250, 3).await;
        let jawa = app.zone("Jawa", 10_000).await;
        let token = app.token(7, Role::Customer);

        let (status, body) = app
            .send(
                Method::POST,
                "/customer/checkout",
                Some(&token),
                Some(json!({ "items": [{ "product_id": kaos.id, "quantity": 5 }], "shipping_zone_id": jawa })),
            )
            .await;

        assert_eq!(status, 422);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");
        assert_eq!(
            body["message"],
            "Insufficient stock for product 'Kaos Polos'. Available: 3, requested: 5."
        );
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let app = TestApp::new().await;
        let token = app.token(7, Role::Customer);

        let (status, body) = app
            .send(Method::POST, "/customer/checkout", Some(&token), Some(json!({ "items": "lots" })))
            .await;

        assert_eq!(status, 422);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_auth_is_required_and_role_checked() {
        let app = TestApp::new().await;

        let (status, body) = app.send(Method::GET, "/customer/orders", None, None).await;
        assert_eq!(status, 401);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = app.send(Method::GET, "/customer/orders", Some("not-a-jwt"), None).await;
        assert_eq!(status, 401);

        let owner = app.token(1, Role::Owner);
        let (status, body) = app.send(Method::GET, "/customer/orders", Some(&owner), None).await;
        assert_eq!(status, 403);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_caller() {
        let app = TestApp::new().await;
        let kaos = app.product("Kaos Polos", 25_000, 250, 100).await;
        let jawa = app.zone("Jawa", 10_000).await;
        let budi = app.token(7, Role::Customer);
        let sari = app.token(8, Role::Customer);
        let cart = json!({ "items": [{ "product_id": kaos.id, "quantity": 1 }], "shipping_zone_id": jawa });

        let (_, created) = app.send(Method::POST, "/customer/checkout", Some(&budi), Some(cart.clone())).await;
        app.send(Method::POST, "/customer/checkout", Some(&budi), Some(cart.clone())).await;
        app.send(Method::POST, "/customer/checkout", Some(&sari), Some(cart)).await;
        let order_id = created["data"]["id"].as_i64().unwrap();

        let (status, body) = app.send(Method::GET, "/customer/orders?per_page=1", Some(&budi), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["total"], 2);
        assert_eq!(body["data"]["last_page"], 2);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let uri = format!("/customer/orders/{}", order_id);
        let (status, body) = app.send(Method::GET, &uri, Some(&budi), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["items"][0]["quantity"], 1);

        let (status, body) = app.send(Method::GET, &uri, Some(&sari), None).await;
        assert_eq!(status, 404);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_pay_issues_session_token() {
        let app = TestApp::new().await;
        let kaos = app.product("Kaos Polos", 25_000, 250, 100).await;
        let jawa = app.zone("Jawa", 10_000).await;
        let token = app.token(7, Role::Customer);
        let cart = json!({ "items": [{ "product_id": kaos.id, "quantity": 2 }], "shipping_zone_id": jawa });

        let (_, created) = app.send(Method::POST, "/customer/checkout", Some(&token), Some(cart)).await;
        let order_id = created["data"]["id"].as_i64().unwrap();

        let (status, body) = app
            .send(Method::POST, &format!("/customer/orders/{}/pay", order_id), Some(&token), None)
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["snap_token"], "snap-token-1");

        let requests = app.snap.requests.lock().unwrap();
        assert_eq!(requests[0].transaction_details.gross_amount, 60_000);
        assert_eq!(requests[0].customer_details.first_name, "Budi");
    }

    #[tokio::test]
    async fn test_checkout_and_pay() {
        let app = TestApp::new().await;
        let kaos = app.product("Kaos Polos", 25_000, 250, 100).await;
        let jawa = app.zone("Jawa", 10_000).await;
        let token = app.token(7, Role::Customer);

        let (status, body) = app
            .send(
                Method::POST,
                "/customer/checkout-and-pay",
                Some(&token),
                Some(json!({ "items": [{ "product_id": kaos.id, "quantity": 1 }], "shipping_zone_id": jawa })),
            )
            .await;

        assert_eq!(status, 201);
        assert_eq!(body["data"]["snap_token"], "snap-token-1");
        assert_eq!(body["data"]["order"]["total_price"], 35_000);

        let order_id = body["data"]["order"]["id"].as_i64().unwrap();
        let stored = app.state.db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(stored.snap_token.as_deref(), Some("snap-token-1"));
    }
}
