use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::booking::{Booking, BookingContext, ContextWindow, NewBookingParams};
use crate::domain::models::payment::Payment;
use crate::domain::models::slot::Slot;
use crate::domain::models::venue::Court;
use crate::domain::ports::{
    BookingRepository, CatalogRepository, CheckoutRequest, NotificationService, PaymentGateway,
    PaymentRepository,
};
use crate::domain::services::duplicate::{DuplicateDetector, SubmittedContact};
use crate::domain::services::overlap::TimeWindow;
use crate::error::{is_retryable_tx_error, is_unique_violation, AppError};

const MAX_TX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 100;

pub struct RequestedWindow {
    pub court_id: String,
    pub window: TimeWindow,
}

pub struct CreateReservationParams {
    pub venue_id: String,
    pub date: NaiveDate,
    pub windows: Vec<RequestedWindow>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub total_price: i64,
    pub currency: String,
}

pub enum ReservationOutcome {
    Created {
        booking: Booking,
        slots: Vec<Slot>,
        checkout_url: Option<String>,
    },
    /// An equivalent submission was seen moments ago; the caller is handed
    /// the existing booking and its payment link instead of a new one.
    Duplicate {
        booking: Booking,
        checkout_url: Option<String>,
    },
}

pub struct ReservationService {
    catalog_repo: Arc<dyn CatalogRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    duplicate_detector: DuplicateDetector,
    frontend_url: String,
}

impl ReservationService {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_gateway: Arc<dyn PaymentGateway>,
        config: &Config,
    ) -> Self {
        let duplicate_detector = DuplicateDetector::new(
            booking_repo.clone(),
            config.duplicate_window_secs,
            config.duplicate_price_tolerance_pct,
        );
        Self {
            catalog_repo,
            booking_repo,
            payment_repo,
            payment_gateway,
            duplicate_detector,
            frontend_url: config.frontend_url.clone(),
        }
    }

    pub async fn create_reservation(&self, params: CreateReservationParams) -> Result<ReservationOutcome, AppError> {
        self.validate(&params)?;

        let venue = self.catalog_repo.find_venue(&params.venue_id).await?
            .ok_or(AppError::NotFound("Venue not found".into()))?;

        let courts = self.load_courts(&params).await?;

        // Advisory pre-check, outside the reservation transaction.
        let contact = SubmittedContact {
            email: &params.customer_email,
            phone: params.customer_phone.as_deref(),
        };
        if let Some(existing) = self.duplicate_detector
            .find_recent_duplicate(&params.venue_id, params.date, &contact, params.total_price)
            .await?
        {
            let checkout_url = self.ensure_checkout_session(&existing).await;
            return Ok(ReservationOutcome::Duplicate { booking: existing, checkout_url });
        }

        let context = BookingContext {
            venue_name: venue.name.clone(),
            windows: params.windows.iter().map(|w| ContextWindow {
                court_id: w.court_id.clone(),
                court_name: courts.get(&w.court_id).map(|c| c.name.clone()).unwrap_or_default(),
                start_time: w.window.start,
                end_time: w.window.end,
            }).collect(),
        };

        let booking = Booking::new(NewBookingParams {
            venue_id: params.venue_id.clone(),
            date: params.date,
            total_price: params.total_price,
            currency: params.currency.clone(),
            customer_name: params.customer_name.clone(),
            customer_email: params.customer_email.clone(),
            customer_phone: params.customer_phone.clone(),
            context,
        });

        let slots: Vec<Slot> = params.windows.iter().map(|w| Slot::reserved(
            w.court_id.clone(),
            params.date,
            w.window.start,
            w.window.end,
            booking.id.clone(),
        )).collect();

        let created = self.create_with_retry(&booking, &slots).await?;
        let created_slots = self.booking_repo.slots_for_booking(&created.id).await?;

        info!(
            booking_id = %created.id,
            venue_id = %created.venue_id,
            slot_count = created_slots.len(),
            "Reservation created"
        );

        let checkout_url = self.ensure_checkout_session(&created).await;
        Ok(ReservationOutcome::Created { booking: created, slots: created_slots, checkout_url })
    }

    /// Runs the atomic create, re-running the whole transaction on transient
    /// aborts with exponential backoff. A unique-index violation on the slot
    /// window is a lost race, not a transient fault: it maps to Conflict and
    /// is never retried.
    async fn create_with_retry(&self, booking: &Booking, slots: &[Slot]) -> Result<Booking, AppError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.booking_repo.create_reservation(booking, slots).await {
                Ok(created) => return Ok(created),
                Err(AppError::Database(e)) if is_unique_violation(&e) => {
                    return Err(AppError::Conflict(
                        "Requested time is no longer available".to_string(),
                    ));
                }
                Err(AppError::Database(e)) if is_retryable_tx_error(&e) => {
                    if attempt >= MAX_TX_ATTEMPTS {
                        warn!(
                            booking_id = %booking.id,
                            attempts = attempt,
                            "Reservation transaction kept aborting, giving up"
                        );
                        return Err(AppError::TryAgain(
                            "The venue is busy right now, please try again".to_string(),
                        ));
                    }
                    let backoff = Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow(attempt));
                    warn!(
                        booking_id = %booking.id,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying reservation transaction after transient abort: {}", e
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Opens a checkout session for the booking, reusing an existing one if
    /// present. Gateway failure leaves the booking pending without a session
    /// (the caller may resubmit, and the sweeper reclaims it at the deadline)
    /// rather than failing the already-committed reservation.
    async fn ensure_checkout_session(&self, booking: &Booking) -> Option<String> {
        match self.payment_repo.find_by_booking(&booking.id).await {
            Ok(Some(payment)) if payment.checkout_url.is_some() => return payment.checkout_url,
            Ok(_) => {}
            Err(e) => {
                warn!(booking_id = %booking.id, "Failed to look up payment record: {}", e);
                return None;
            }
        }

        let request = CheckoutRequest {
            booking_id: booking.id.clone(),
            amount: booking.total_price,
            currency: booking.currency.clone(),
            success_url: format!("{}/bookings/{}/success", self.frontend_url, booking.id),
            cancel_url: format!("{}/bookings/{}/cancelled", self.frontend_url, booking.id),
        };

        match self.payment_gateway.create_checkout_session(&request).await {
            Ok(session) => {
                let payment = Payment::new(
                    booking.id.clone(),
                    session.session_id.clone(),
                    session.checkout_url.clone(),
                    booking.total_price,
                    booking.currency.clone(),
                );
                if let Err(e) = self.payment_repo.create(&payment).await {
                    warn!(booking_id = %booking.id, "Failed to persist payment record: {}", e);
                }
                Some(session.checkout_url)
            }
            Err(e) => {
                warn!(booking_id = %booking.id, "Failed to open checkout session: {}", e);
                None
            }
        }
    }

    fn validate(&self, params: &CreateReservationParams) -> Result<(), AppError> {
        if params.windows.is_empty() {
            return Err(AppError::Validation("At least one time window is required".into()));
        }
        if params.customer_name.trim().is_empty() || params.customer_email.trim().is_empty() {
            return Err(AppError::Validation("Customer name and email are required".into()));
        }
        if params.total_price <= 0 {
            return Err(AppError::Validation("Total price must be positive".into()));
        }

        // Windows inside one request must not collide with each other; the
        // database check only guards against other bookings.
        for (i, a) in params.windows.iter().enumerate() {
            for b in params.windows.iter().skip(i + 1) {
                if a.court_id == b.court_id && a.window.overlaps(&b.window) {
                    return Err(AppError::Validation(format!(
                        "Requested windows {} and {} overlap on the same court",
                        a.window, b.window
                    )));
                }
            }
        }
        Ok(())
    }

    async fn load_courts(&self, params: &CreateReservationParams) -> Result<HashMap<String, Court>, AppError> {
        let mut courts = HashMap::new();
        for w in &params.windows {
            if courts.contains_key(&w.court_id) {
                continue;
            }
            let court = self.catalog_repo.find_court(&w.court_id).await?
                .ok_or_else(|| AppError::NotFound(format!("Court {} not found", w.court_id)))?;
            if court.venue_id != params.venue_id {
                return Err(AppError::Validation(format!(
                    "Court {} does not belong to venue {}",
                    w.court_id, params.venue_id
                )));
            }
            courts.insert(w.court_id.clone(), court);
        }
        Ok(courts)
    }
}

/// Cancels a still-pending booking on behalf of the customer, releasing its
/// slots. Confirmed bookings are not cancellable through this path.
pub async fn cancel_pending_booking(
    booking_repo: &Arc<dyn BookingRepository>,
    notification_service: &Arc<dyn NotificationService>,
    booking_id: &str,
) -> Result<Booking, AppError> {
    use crate::domain::models::booking::{booking_payment_status, booking_status};

    let booking = booking_repo.find_by_id(booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !booking.is_pending_payment() {
        return Err(AppError::Conflict("Only unpaid bookings can be cancelled".into()));
    }

    let applied = booking_repo
        .release(booking_id, booking_status::CANCELLED, booking_payment_status::FAILED)
        .await?;
    if !applied {
        return Err(AppError::Conflict("Booking is no longer cancellable".into()));
    }

    if let Err(e) = notification_service.notify_booking_cancelled(&booking, "customer_cancelled").await {
        warn!(booking_id = %booking_id, "Cancellation notification failed: {}", e);
    }

    booking_repo.find_by_id(booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))
}
