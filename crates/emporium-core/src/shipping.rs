//! # Shipping Cost
//!
//! Weight-based tariff: every started kilogram is billed in full.
//!
//! ```text
//!   weight_grams     billable kg     cost @ Rp 10.000/kg
//!   ────────────     ───────────     ───────────────────
//!          1              1              Rp 10.000
//!       1000              1              Rp 10.000
//!       1001              2              Rp 20.000
//!       2500              3              Rp 30.000
//! ```

use crate::money::Money;
use crate::types::{ShippingQuote, ShippingZone};

const GRAMS_PER_KG: i64 = 1000;

/// Rounds a weight up to whole kilograms. Non-positive weights bill nothing.
#[inline]
pub fn billable_kilograms(weight_grams: i64) -> i64 {
    if weight_grams <= 0 {
        return 0;
    }
    (weight_grams + GRAMS_PER_KG - 1) / GRAMS_PER_KG
}

/// `ceil(weight_grams / 1000) × price_per_kg`.
#[inline]
pub fn shipping_cost(weight_grams: i64, price_per_kg: Money) -> Money {
    price_per_kg.multiply_quantity(billable_kilograms(weight_grams))
}

/// Builds a quote for `weight_grams` shipped to `zone`.
pub fn quote(zone: &ShippingZone, weight_grams: i64) -> ShippingQuote {
    let billable_kg = billable_kilograms(weight_grams);
    ShippingQuote {
        zone_name: zone.name.clone(),
        weight_grams,
        billable_kg,
        cost: zone.price_per_kg.multiply_quantity(billable_kg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_partial_kilogram_rounds_up() {
        let tariff = Money::from_minor(10_000);
        assert_eq!(shipping_cost(1, tariff).minor(), 10_000);
        assert_eq!(shipping_cost(1000, tariff).minor(), 10_000);
        assert_eq!(shipping_cost(1001, tariff).minor(), 20_000);
    }

    #[test]
    fn test_zero_weight_is_free() {
        assert_eq!(billable_kilograms(0), 0);
        assert!(shipping_cost(0, Money::from_minor(35_000)).is_zero());
    }

    #[test]
    fn test_quote_snapshots_zone_name() {
        let now = Utc::now();
        let zone = ShippingZone {
            id: 3,
            name: "Kalimantan".to_string(),
            price_per_kg: Money::from_minor(22_000),
            created_at: now,
            updated_at: now,
        };
        let q = quote(&zone, 2_500);
        assert_eq!(q.zone_name, "Kalimantan");
        assert_eq!(q.billable_kg, 3);
        assert_eq!(q.cost.minor(), 66_000);
    }
}
