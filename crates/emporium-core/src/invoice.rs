//! # Invoice Numbers
//!
//! Human-readable order identifiers of the form `INV-YYYYMMDD-NNNN`:
//! the checkout date followed by a zero-padded four-digit suffix.
//! The invoice number doubles as the `order_id` the payment provider echoes
//! back in notifications.
//!
//! Uniqueness is not a property of this type; the generator in
//! emporium-orders probes storage inside the checkout transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Smallest suffix handed out.
pub const MIN_SUFFIX: u16 = 1;
/// Largest suffix handed out (four digits).
pub const MAX_SUFFIX: u16 = 9999;

const PREFIX: &str = "INV-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Composes `INV-{date:%Y%m%d}-{suffix:04}`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use emporium_core::invoice::InvoiceNumber;
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
    /// assert_eq!(InvoiceNumber::compose(date, 42).as_str(), "INV-20260309-0042");
    /// ```
    pub fn compose(date: NaiveDate, suffix: u16) -> Self {
        InvoiceNumber(format!("{}{}-{:04}", PREFIX, date.format("%Y%m%d"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The date segment.
    pub fn date(&self) -> Option<NaiveDate> {
        let segment = self.0.get(PREFIX.len()..PREFIX.len() + 8)?;
        NaiveDate::parse_from_str(segment, "%Y%m%d").ok()
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InvoiceNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix(PREFIX)
            .ok_or_else(|| invalid("must start with INV-"))?;
        let (date, suffix) = rest
            .split_once('-')
            .ok_or_else(|| invalid("expected INV-YYYYMMDD-NNNN"))?;

        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(invalid("date segment must be a valid YYYYMMDD"));
        }
        if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("suffix must be four digits"));
        }

        Ok(InvoiceNumber(s.to_string()))
    }
}
