//! Shipping zones: public listing plus `ManageShippingZones` writes.
//!
//! Writes go through [`ShippingCalculator`](emporium_orders::ShippingCalculator)
//! so the zone cache is invalidated before the response is sent.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;

use emporium_core::{Capability, ShippingZone};

use super::{ApiJson, ApiResult, Envelope};
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ZoneBody {
    pub name: String,
    pub price_per_kg: i64,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Envelope<Vec<ShippingZone>>> {
    let zones = state.shipping.zones().await?;
    Ok(Envelope::ok("Shipping zones retrieved", zones))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(body): ApiJson<ZoneBody>,
) -> ApiResult<Response> {
    user.require(Capability::ManageShippingZones)?;
    let zone = state.shipping.create_zone(&body.name, body.price_per_kg).await?;
    Ok(Envelope::ok("Shipping zone created", zone).with_status(StatusCode::CREATED))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(zone_id): Path<i64>,
    ApiJson(body): ApiJson<ZoneBody>,
) -> ApiResult<Envelope<ShippingZone>> {
    user.require(Capability::ManageShippingZones)?;
    let zone = state.shipping.update_zone(zone_id, &body.name, body.price_per_kg).await?;
    Ok(Envelope::ok("Shipping zone updated", zone))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(zone_id): Path<i64>,
) -> ApiResult<Envelope<()>> {
    user.require(Capability::ManageShippingZones)?;
    state.shipping.delete_zone(zone_id).await?;
    Ok(Envelope::ok("Shipping zone deleted", ()))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use emporium_core::Role;

    use crate::state::test_support::TestApp;

    #[tokio::test]
    async fn test_public_list_reflects_admin_writes() {
        let app = TestApp::new().await;
        let admin = app.token(1, Role::Admin);

        // Prime the cache with the empty list.
        let (status, body) = app.send(Method::GET, "/public/shipping-zones", None, None).await;
        assert_eq!(status, 200);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let (status, created) = app
            .send(
                Method::POST,
                "/admin/shipping-zones",
                Some(&admin),
                Some(json!({ "name": "Jawa", "price_per_kg": 10_000 })),
            )
            .await;
        assert_eq!(status, 201);
        let id = created["data"]["id"].as_i64().unwrap();

        let (_, body) = app.send(Method::GET, "/public/shipping-zones", None, None).await;
        assert_eq!(body["data"][0]["name"], "Jawa");

        let (status, body) = app
            .send(
                Method::PUT,
                &format!("/admin/shipping-zones/{}", id),
                Some(&admin),
                Some(json!({ "name": "Jawa", "price_per_kg": 12_000 })),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["price_per_kg"], 12_000);

        let (_, body) = app.send(Method::GET, "/public/shipping-zones", None, None).await;
        assert_eq!(body["data"][0]["price_per_kg"], 12_000);

        let (status, _) = app
            .send(Method::DELETE, &format!("/admin/shipping-zones/{}", id), Some(&admin), None)
            .await;
        assert_eq!(status, 200);

        let (_, body) = app.send(Method::GET, "/public/shipping-zones", None, None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zone_write_rejections() {
        let app = TestApp::new().await;
        let admin = app.token(1, Role::Admin);
        let customer = app.token(7, Role::Customer);

        let (status, _) = app
            .send(
                Method::POST,
                "/admin/shipping-zones",
                Some(&customer),
                Some(json!({ "name": "Jawa", "price_per_kg": 10_000 })),
            )
            .await;
        assert_eq!(status, 403);

        let (status, body) = app
            .send(
                Method::POST,
                "/admin/shipping-zones",
                Some(&admin),
                Some(json!({ "name": "  ", "price_per_kg": 10_000 })),
            )
            .await;
        assert_eq!(status, 422);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = app.send(Method::DELETE, "/admin/shipping-zones/404", Some(&admin), None).await;
        assert_eq!(status, 404);
    }
}
