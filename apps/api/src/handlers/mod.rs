//! HTTP handlers, grouped by audience.
//!
//! - [`customer`] - checkout, payment sessions, own orders
//! - [`admin`] - order listing and status updates
//! - [`zones`] - public zone list and zone administration
//! - [`payment`] - provider webhook (enqueue only)

pub mod admin;
pub mod customer;
pub mod payment;
pub mod zones;

use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use emporium_core::Page;

use crate::error::ApiError;

/// JSON body extractor whose rejection uses the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Success envelope: `{ "success": true, "message": ..., "data": ... }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Envelope {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A page of results with its position.
#[derive(Debug, Serialize)]
pub struct PageBody<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

impl<T> From<Page<T>> for PageBody<T> {
    fn from(page: Page<T>) -> Self {
        let last_page = page.last_page();
        PageBody {
            items: page.items,
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            last_page,
        }
    }
}
