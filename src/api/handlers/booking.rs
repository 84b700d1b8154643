use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::responses::{BookingDetailResponse, SyncResponse};
use crate::domain::services::reservation::cancel_pending_booking;
use crate::error::AppError;
use crate::state::AppState;

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&booking_id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    let slots = state.booking_repo.slots_for_booking(&booking_id).await?;
    let payment = state.payment_repo.find_by_booking(&booking_id).await?;

    Ok(Json(BookingDetailResponse { booking, slots, payment }))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cancelled = cancel_pending_booking(
        &state.booking_repo,
        &state.notification_service,
        &booking_id,
    ).await?;
    info!("Booking cancelled by customer: {}", booking_id);
    Ok(Json(cancelled))
}

/// Poll-driven reconciliation for when the webhook never arrived (or the
/// customer is staring at a "waiting for payment" page).
pub async fn sync_payment(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.reconciler.sync_booking(&booking_id).await?;
    Ok(Json(SyncResponse { booking_id, outcome: outcome.as_str() }))
}
