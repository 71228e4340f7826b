//! Invoice number allocation.
//!
//! `INV-YYYYMMDD-NNNN` with a random four-digit suffix, redrawn until it
//! is unused. Runs inside the checkout transaction, which already holds
//! the write lock, so the existence check cannot race another checkout.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::SqliteConnection;
use std::sync::Mutex;
use tracing::debug;

use emporium_core::invoice::{MAX_SUFFIX, MIN_SUFFIX};
use emporium_core::InvoiceNumber;
use emporium_db::repository::order;

use crate::error::CheckoutError;

/// Draws before giving up on a day.
pub const DEFAULT_MAX_DRAWS: u32 = 64;

#[derive(Debug)]
pub struct InvoiceGenerator {
    rng: Mutex<StdRng>,
    max_draws: u32,
}

impl InvoiceGenerator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_max_draws(mut self, max_draws: u32) -> Self {
        self.max_draws = max_draws.max(1);
        self
    }

    fn from_rng(rng: StdRng) -> Self {
        InvoiceGenerator {
            rng: Mutex::new(rng),
            max_draws: DEFAULT_MAX_DRAWS,
        }
    }

    fn draw(&self, date: NaiveDate) -> InvoiceNumber {
        let suffix = self
            .rng
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .gen_range(MIN_SUFFIX..=MAX_SUFFIX);
        InvoiceNumber::compose(date, suffix)
    }

    /// Returns an invoice number for `date` not yet used by any order.
    pub async fn generate(&self, conn: &mut SqliteConnection, date: NaiveDate) -> Result<InvoiceNumber, CheckoutError> {
        for attempt in 1..=self.max_draws {
            let candidate = self.draw(date);
            if !order::invoice_exists(&mut *conn, candidate.as_str()).await? {
                return Ok(candidate);
            }
            debug!(invoice = %candidate, attempt, "Invoice number taken, redrawing");
        }

        Err(CheckoutError::InvoiceSpaceExhausted {
            date: date.format("%Y-%m-%d").to_string(),
        })
    }
}

impl Default for InvoiceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
