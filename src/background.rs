use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::models::booking::{booking_payment_status, booking_status};
use crate::state::AppState;

/// Background reclamation of reservations whose payment never arrived.
/// The only writer of slot state besides the orchestrator and the
/// reconciler; all three share the repository's court-lock ordering.
pub async fn start_expiry_sweeper(state: Arc<AppState>) {
    info!(
        interval_secs = state.config.sweeper_interval_secs,
        timeout_min = state.config.pending_timeout_min,
        "Starting expiry sweeper..."
    );

    loop {
        match run_sweep_once(&state).await {
            Ok(0) => {}
            Ok(n) => info!("Expiry sweep released {} stale booking(s)", n),
            Err(e) => error!("Expiry sweep failed: {:?}", e),
        }
        sleep(Duration::from_secs(state.config.sweeper_interval_secs)).await;
    }
}

/// One sweep pass, separated out so tests can drive it directly. Each stale
/// booking is expired in its own transaction; one failure does not stop the
/// rest of the pass.
pub async fn run_sweep_once(state: &Arc<AppState>) -> Result<usize, crate::error::AppError> {
    let cutoff = Utc::now() - chrono::Duration::minutes(state.config.pending_timeout_min);
    let stale = state.booking_repo.find_expired_pending(cutoff).await?;

    let mut released = 0;
    for booking in stale {
        let span = info_span!(
            "expire_booking",
            booking_id = %booking.id,
            venue_id = %booking.venue_id,
            created_at = %booking.created_at
        );

        async {
            match state.booking_repo
                .release(&booking.id, booking_status::EXPIRED, booking_payment_status::EXPIRED)
                .await
            {
                Ok(true) => {
                    info!("Booking expired, slots released");
                    released += 1;
                    if let Err(e) = state.notification_service
                        .notify_booking_cancelled(&booking, "payment_timeout")
                        .await
                    {
                        warn!("Expiry notification failed: {}", e);
                    }
                }
                // Lost the race against a payment confirmation or a cancel;
                // nothing to reclaim.
                Ok(false) => {}
                Err(e) => error!("Failed to expire booking: {:?}", e),
            }
        }
            .instrument(span)
            .await;
    }

    Ok(released)
}
