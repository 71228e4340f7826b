//! # Validation Module
//!
//! Input validation for requests entering the pipeline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                        │
//! │  └── Shape and types of the JSON body                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Non-empty item list, quantity bounds                               │
//! │  └── Duplicate lines merged so stock checks see the real total          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (stock >= 0), CHECK (quantity >= 1)                          │
//! │  └── UNIQUE (invoice_number)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::checkout::CheckoutLine;
use crate::error::ValidationError;
use crate::{DEFAULT_PER_PAGE, MAX_CHECKOUT_LINES, MAX_ITEM_QUANTITY, MAX_PER_PAGE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Checkout Lines
// =============================================================================

/// Validates checkout lines and merges duplicates.
///
/// ## Rules
/// - At least one line, at most `MAX_CHECKOUT_LINES`
/// - Product ids are positive
/// - Every quantity (and every merged total) is within 1..=`MAX_ITEM_QUANTITY`
///
/// Merged lines keep the position of the first occurrence, so error
/// reporting follows the order the customer sent.
///
/// ## Example
/// ```rust
/// use emporium_core::checkout::CheckoutLine;
/// use emporium_core::validation::normalize_checkout_lines;
///
/// let lines = normalize_checkout_lines(&[
///     CheckoutLine { product_id: 7, quantity: 1 },
///     CheckoutLine { product_id: 7, quantity: 2 },
/// ]).unwrap();
/// assert_eq!(lines, vec![CheckoutLine { product_id: 7, quantity: 3 }]);
/// ```
pub fn normalize_checkout_lines(lines: &[CheckoutLine]) -> ValidationResult<Vec<CheckoutLine>> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_CHECKOUT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CHECKOUT_LINES as i64,
        });
    }

    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());

    for line in lines {
        if line.product_id <= 0 {
            return Err(ValidationError::InvalidFormat {
                field: "product_id".to_string(),
                reason: "must be a positive id".to_string(),
            });
        }
        validate_quantity(line.quantity)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity += line.quantity;
                validate_quantity(existing.quantity)?;
            }
            None => merged.push(*line),
        }
    }

    Ok(merged)
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed `MAX_ITEM_QUANTITY` (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Shipping Zones
// =============================================================================

/// Validates a shipping zone name (1..=255 characters after trimming).
pub fn validate_zone_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 255 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 255,
        });
    }

    Ok(name.to_string())
}

/// Validates a per-kilogram tariff (non-negative).
pub fn validate_price_per_kg(price: i64) -> ValidationResult<()> {
    if price < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price_per_kg".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Pagination
// =============================================================================

/// Applies defaults and bounds to listing parameters.
///
/// Returns `(page, per_page)` with `page >= 1` and
/// `1 <= per_page <= MAX_PER_PAGE`.
pub fn normalize_pagination(page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64) -> CheckoutLine {
        CheckoutLine { product_id, quantity }
    }

    #[test]
    fn test_empty_items_rejected() {
        assert!(matches!(
            normalize_checkout_lines(&[]),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(normalize_checkout_lines(&[line(1, 0)]).is_err());
        assert!(normalize_checkout_lines(&[line(1, -2)]).is_err());
    }

    #[test]
    fn test_duplicates_merged_in_first_seen_order() {
        let lines = normalize_checkout_lines(&[line(2, 1), line(1, 1), line(2, 4)]).unwrap();
        assert_eq!(lines, vec![line(2, 5), line(1, 1)]);
    }

    #[test]
    fn test_merged_quantity_bounded() {
        assert!(normalize_checkout_lines(&[line(1, 600), line(1, 600)]).is_err());
    }

    #[test]
    fn test_non_positive_product_id_rejected() {
        assert!(normalize_checkout_lines(&[line(0, 1)]).is_err());
    }

    #[test]
    fn test_validate_zone_name() {
        assert_eq!(validate_zone_name("  Jawa ").unwrap(), "Jawa");
        assert!(validate_zone_name("   ").is_err());
        assert!(validate_zone_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_normalize_pagination() {
        assert_eq!(normalize_pagination(None, None), (1, 15));
        assert_eq!(normalize_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_pagination(Some(4), Some(500)), (4, 100));
    }
}
