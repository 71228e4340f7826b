//! # Checkout Pricing
//!
//! Turns normalized checkout lines plus the locked product rows into a
//! priced cart: unit prices frozen, subtotal summed, weight accumulated.
//!
//! ```text
//!  CheckoutLine { product_id: 1, quantity: 2 }     Product #1 (Rp 25.000, 250g)
//!  CheckoutLine { product_id: 2, quantity: 1 }  +  Product #2 (Rp 15.000, 500g)
//!                         │
//!                         ▼
//!  PricedCart { subtotal: Rp 65.000, weight_grams: 1000, lines: [...] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;

/// One requested product and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: i64,
    pub quantity: i64,
}

/// A checkout line with its unit price frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub weight_grams: i64,
}

/// Prices `lines` against `products`, checking existence and stock.
///
/// Lines must already be normalized (no duplicate product ids). The first
/// failing line, in request order, determines the error.
pub fn price_cart(lines: &[CheckoutLine], products: &HashMap<i64, Product>) -> CoreResult<PricedCart> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::zero();
    let mut weight_grams = 0i64;

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or(CoreError::ProductNotFound(line.product_id))?;

        product.ensure_available(line.quantity)?;

        let priced_line = PricedLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
        };
        subtotal += priced_line.line_total();
        weight_grams += product.weight_grams * line.quantity;
        priced.push(priced_line);
    }

    Ok(PricedCart {
        lines: priced,
        subtotal,
        weight_grams,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn catalog() -> HashMap<i64, Product> {
        let now = Utc::now();
        let mut map = HashMap::new();
        map.insert(
            1,
            Product {
                id: 1,
                name: "Kaos Polos".to_string(),
                price: Money::from_minor(25_000),
                weight_grams: 250,
                stock: 10,
                created_at: now,
                updated_at: now,
            },
        );
        map.insert(
            2,
            Product {
                id: 2,
                name: "Topi".to_string(),
                price: Money::from_minor(15_000),
                weight_grams: 500,
                stock: 1,
                created_at: now,
                updated_at: now,
            },
        );
        map
    }

    #[test]
    fn test_prices_cart_and_accumulates_weight() {
        let lines = [
            CheckoutLine { product_id: 1, quantity: 2 },
            CheckoutLine { product_id: 2, quantity: 1 },
        ];
        let cart = price_cart(&lines, &catalog()).unwrap();

        assert_eq!(cart.subtotal.minor(), 65_000);
        assert_eq!(cart.weight_grams, 1_000);
        assert_eq!(cart.lines[0].unit_price.minor(), 25_000);
        assert_eq!(cart.lines[1].name, "Topi");
    }

    #[test]
    fn test_unknown_product_rejected() {
        let lines = [CheckoutLine { product_id: 99, quantity: 1 }];
        let err = price_cart(&lines, &catalog()).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(99)));
    }

    #[test]
    fn test_stock_shortfall_rejected() {
        let lines = [
            CheckoutLine { product_id: 1, quantity: 1 },
            CheckoutLine { product_id: 2, quantity: 2 },
        ];
        let err = price_cart(&lines, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 1, requested: 2, .. }
        ));
    }
}
