use std::sync::Arc;
use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use crate::domain::models::booking::Booking;
use crate::domain::ports::BookingRepository;
use crate::error::AppError;

/// Heuristic double-submit suppression. Runs before the reservation
/// transaction, never inside it: a missed duplicate only costs the customer
/// a second pending booking (which the sweeper reclaims), while a false
/// positive would wrongly swallow a distinct booking. The matcher therefore
/// errs toward false negatives.
pub struct DuplicateDetector {
    booking_repo: Arc<dyn BookingRepository>,
    lookback: Duration,
    price_tolerance_pct: f64,
}

pub struct SubmittedContact<'a> {
    pub email: &'a str,
    pub phone: Option<&'a str>,
}

impl DuplicateDetector {
    pub fn new(booking_repo: Arc<dyn BookingRepository>, lookback_secs: i64, price_tolerance_pct: f64) -> Self {
        Self {
            booking_repo,
            lookback: Duration::seconds(lookback_secs),
            price_tolerance_pct,
        }
    }

    /// Best-effort lookup of a just-created booking for the same venue, date,
    /// contact, and (approximately) the same price.
    pub async fn find_recent_duplicate(
        &self,
        venue_id: &str,
        date: NaiveDate,
        contact: &SubmittedContact<'_>,
        total_price: i64,
    ) -> Result<Option<Booking>, AppError> {
        let since = Utc::now() - self.lookback;
        let recent = self.booking_repo.find_recent_by_venue(venue_id, since).await?;

        let hit = recent.into_iter().find(|b| {
            b.date == date
                && contact_matches(b, contact)
                && price_within_tolerance(b.total_price, total_price, self.price_tolerance_pct)
        });

        if let Some(ref existing) = hit {
            info!(
                booking_id = %existing.id,
                venue_id = %venue_id,
                "Duplicate submission detected, returning existing booking"
            );
        }

        Ok(hit)
    }
}

fn contact_matches(existing: &Booking, submitted: &SubmittedContact<'_>) -> bool {
    if existing.customer_email.trim().eq_ignore_ascii_case(submitted.email.trim()) {
        return true;
    }
    match (&existing.customer_phone, submitted.phone) {
        (Some(a), Some(b)) => {
            let a = digits(a);
            let b = digits(b);
            !a.is_empty() && a == b
        }
        _ => false,
    }
}

/// Within +/- tolerance percent of the existing booking's price, absorbing
/// rounding and partial-fee differences.
fn price_within_tolerance(existing: i64, submitted: i64, tolerance_pct: f64) -> bool {
    let diff = (existing - submitted).abs() as f64;
    diff <= existing.abs() as f64 * tolerance_pct / 100.0
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}
