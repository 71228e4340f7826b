//! Roles and the capabilities they grant.
//!
//! ```text
//!   capability            owner   admin   customer
//!   ──────────────────    ─────   ─────   ────────
//!   manage_products         ✓       ✓
//!   manage_categories       ✓       ✓
//!   manage_orders           ✓       ✓
//!   manage_shipping_zones   ✓       ✓
//!   view_financial          ✓
//!   manage_users            ✓
//!   export_reports          ✓
//!   place_orders                             ✓
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    /// Storefront account. Legacy tokens carry `"user"`.
    #[serde(alias = "user")]
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageProducts,
    ManageCategories,
    ManageOrders,
    ManageShippingZones,
    ViewFinancial,
    ManageUsers,
    ExportReports,
    PlaceOrders,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Owner => !matches!(capability, PlaceOrders),
            Role::Admin => matches!(
                capability,
                ManageProducts | ManageCategories | ManageOrders | ManageShippingZones
            ),
            Role::Customer => matches!(capability, PlaceOrders),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "customer" | "user" => Ok(Role::Customer),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["owner".into(), "admin".into(), "customer".into()],
            }),
        }
    }
}
