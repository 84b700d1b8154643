use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::models::booking::{booking_payment_status, booking_status, Booking};
use crate::domain::models::payment::{ObservedPaymentStatus, PaymentSyncSource};
use crate::domain::ports::{BookingRepository, NotificationService, PaymentGateway, PaymentRepository};
use crate::error::AppError;

/// What a reconciliation pass did. Webhook deliveries may repeat and arrive
/// out of order; every variant except `Confirmed` and `Released` means "no
/// state changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Booking finalized: CONFIRMED/PAID, slots fixed, notification sent.
    Confirmed,
    /// Booking released: slots freed, payment closed out.
    Released,
    /// Still waiting on the gateway; session references annotated.
    StillPending,
    /// The booking was already in a state this event cannot move.
    NoOp,
    /// A success report arrived for a terminally cancelled/expired booking.
    /// Logged for manual follow-up, never auto-applied.
    Anomaly,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Confirmed => "confirmed",
            ReconcileOutcome::Released => "released",
            ReconcileOutcome::StillPending => "still_pending",
            ReconcileOutcome::NoOp => "no_op",
            ReconcileOutcome::Anomaly => "anomaly",
        }
    }
}

/// Applies externally observed payment state to internal booking/payment/slot
/// state. Both the webhook handler and the manual sync endpoint funnel into
/// `apply_payment_status` so the two triggers cannot drift.
pub struct PaymentReconciler {
    booking_repo: Arc<dyn BookingRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    notification_service: Arc<dyn NotificationService>,
}

impl PaymentReconciler {
    pub fn new(
        booking_repo: Arc<dyn BookingRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_gateway: Arc<dyn PaymentGateway>,
        notification_service: Arc<dyn NotificationService>,
    ) -> Self {
        Self { booking_repo, payment_repo, payment_gateway, notification_service }
    }

    pub async fn apply_payment_status(
        &self,
        booking_id: &str,
        observed: ObservedPaymentStatus,
        source: PaymentSyncSource,
    ) -> Result<ReconcileOutcome, AppError> {
        let booking = self.booking_repo.find_by_id(booking_id).await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))?;

        info!(
            booking_id = %booking_id,
            status = %booking.status,
            payment_status = %booking.payment_status,
            observed = ?observed,
            source = %source,
            "Reconciling payment status"
        );

        if booking.status == booking_status::CONFIRMED {
            // Terminal for the payment axis; duplicate or out-of-order
            // deliveries land here.
            return Ok(ReconcileOutcome::NoOp);
        }

        if booking.is_terminal() {
            if observed == ObservedPaymentStatus::Captured {
                warn!(
                    booking_id = %booking_id,
                    status = %booking.status,
                    source = %source,
                    "Anomaly: payment captured for a booking already cancelled/expired; requires manual reconciliation"
                );
                return Ok(ReconcileOutcome::Anomaly);
            }
            return Ok(ReconcileOutcome::NoOp);
        }

        match observed {
            ObservedPaymentStatus::Captured => self.confirm(&booking, source).await,
            ObservedPaymentStatus::SessionExpired => self.release_expired_session(&booking, source).await,
            ObservedPaymentStatus::CompletedUnpaid | ObservedPaymentStatus::Pending => {
                Ok(ReconcileOutcome::StillPending)
            }
            ObservedPaymentStatus::AttemptFailed => {
                // The session may still allow another attempt; record the
                // failure and let the sweeper reclaim the booking if the
                // customer never completes it.
                self.payment_repo.mark_failed_attempt(&booking.id).await?;
                Ok(ReconcileOutcome::StillPending)
            }
        }
    }

    /// Poll-driven reconciliation: fetch the session from the gateway and
    /// feed the observation through the same transition logic.
    pub async fn sync_booking(&self, booking_id: &str) -> Result<ReconcileOutcome, AppError> {
        let payment = self.payment_repo.find_by_booking(booking_id).await?
            .ok_or_else(|| AppError::NotFound(format!("No payment record for booking {}", booking_id)))?;
        let session_id = payment.session_id
            .ok_or(AppError::Validation("Payment has no gateway session to sync".into()))?;

        let session = self.payment_gateway.get_session(&session_id).await?;

        if let Some(intent) = session.payment_intent_id.as_deref() {
            self.payment_repo.annotate_refs(booking_id, Some(&session.session_id), Some(intent)).await?;
        }

        let observed = match (session.status.as_str(), session.payment_status.as_str()) {
            (_, "paid") => ObservedPaymentStatus::Captured,
            ("expired", _) => ObservedPaymentStatus::SessionExpired,
            ("complete", _) => ObservedPaymentStatus::CompletedUnpaid,
            _ => ObservedPaymentStatus::Pending,
        };

        self.apply_payment_status(booking_id, observed, PaymentSyncSource::ManualSync).await
    }

    async fn confirm(&self, booking: &Booking, source: PaymentSyncSource) -> Result<ReconcileOutcome, AppError> {
        let applied = self.booking_repo.confirm_paid(&booking.id).await?;
        if !applied {
            // Another delivery won the race between our read and this update.
            return Ok(ReconcileOutcome::NoOp);
        }

        info!(booking_id = %booking.id, source = %source, "Booking confirmed, payment captured");

        // Committed state is the idempotency guard: only the delivery that
        // actually flipped the status gets here, so the notification fires
        // exactly once. Its failure must not bubble to the gateway caller.
        if let Err(e) = self.notification_service.notify_booking_confirmed(booking).await {
            warn!(booking_id = %booking.id, "Confirmation notification failed: {}", e);
        }

        Ok(ReconcileOutcome::Confirmed)
    }

    async fn release_expired_session(&self, booking: &Booking, source: PaymentSyncSource) -> Result<ReconcileOutcome, AppError> {
        let applied = self.booking_repo
            .release(&booking.id, booking_status::CANCELLED, booking_payment_status::FAILED)
            .await?;
        if !applied {
            return Ok(ReconcileOutcome::NoOp);
        }

        info!(booking_id = %booking.id, source = %source, "Checkout session expired, slots released");

        if let Err(e) = self.notification_service.notify_booking_cancelled(booking, "payment_session_expired").await {
            warn!(booking_id = %booking.id, "Cancellation notification failed: {}", e);
        }

        Ok(ReconcileOutcome::Released)
    }
}
