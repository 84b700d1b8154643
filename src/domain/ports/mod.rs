use crate::domain::models::{
    booking::Booking, payment::Payment, slot::Slot, venue::{Court, Venue},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_venue(&self, venue: &Venue) -> Result<Venue, AppError>;
    async fn find_venue(&self, id: &str) -> Result<Option<Venue>, AppError>;
    async fn create_court(&self, court: &Court) -> Result<Court, AppError>;
    async fn find_court(&self, id: &str) -> Result<Option<Court>, AppError>;
    async fn list_courts(&self, venue_id: &str) -> Result<Vec<Court>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomically create a booking together with its pre-bound slots.
    ///
    /// Implementations must, inside one transaction: lock the referenced
    /// court rows sorted by id, lock the candidate conflicting slot rows,
    /// run the overlap check, and only then insert. A detected overlap
    /// surfaces as `AppError::Conflict` naming the first conflicting window;
    /// transient aborts (serialization failure, deadlock, lock timeout) pass
    /// through as `AppError::Database` for the orchestrator's retry loop.
    async fn create_reservation(&self, booking: &Booking, slots: &[Slot]) -> Result<Booking, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_recent_by_venue(&self, venue_id: &str, since: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn find_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;

    /// PENDING_PAYMENT -> CONFIRMED/PAID, finalizing slots and marking the
    /// payment record succeeded, in one transaction guarded on the current
    /// status. Returns false when the booking was not in PENDING_PAYMENT,
    /// which is how duplicate gateway deliveries become no-ops.
    async fn confirm_paid(&self, booking_id: &str) -> Result<bool, AppError>;

    /// PENDING_PAYMENT -> `status`/`payment_status`, deleting the booking's
    /// slots so the windows become available again. Guarded like
    /// `confirm_paid`; returns whether the transition applied.
    async fn release(&self, booking_id: &str, status: &str, payment_status: &str) -> Result<bool, AppError>;

    async fn slots_for_booking(&self, booking_id: &str) -> Result<Vec<Slot>, AppError>;
    /// Advisory availability read; the authoritative check happens under
    /// locks inside `create_reservation`.
    async fn list_slots(&self, court_id: &str, date: NaiveDate) -> Result<Vec<Slot>, AppError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError>;
    async fn find_by_booking(&self, booking_id: &str) -> Result<Option<Payment>, AppError>;
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, AppError>;
    async fn annotate_refs(&self, booking_id: &str, session_id: Option<&str>, payment_intent_id: Option<&str>) -> Result<(), AppError>;
    async fn mark_failed_attempt(&self, booking_id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Serialize, Clone)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutSession {
    pub session_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySession {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    /// Gateway-side session status: "open", "complete", "expired".
    pub status: String,
    /// Gateway-side money status: "paid", "unpaid".
    pub payment_status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError>;
    async fn get_session(&self, session_id: &str) -> Result<GatewaySession, AppError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify_booking_confirmed(&self, booking: &Booking) -> Result<(), AppError>;
    async fn notify_booking_cancelled(&self, booking: &Booking, reason: &str) -> Result<(), AppError>;
}
