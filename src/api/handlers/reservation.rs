use axum::{extract::{Path, State}, response::IntoResponse, Json};
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::CreateReservationRequest;
use crate::api::dtos::responses::ReservationResponse;
use crate::domain::services::overlap::TimeWindow;
use crate::domain::services::reservation::{CreateReservationParams, RequestedWindow, ReservationOutcome};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let date = NaiveDate::parse_from_str(&payload.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;

    let mut windows = Vec::with_capacity(payload.windows.len());
    for w in &payload.windows {
        let start = NaiveTime::parse_from_str(&w.start, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid start time {} (HH:MM)", w.start)))?;
        let end = NaiveTime::parse_from_str(&w.end, "%H:%M")
            .map_err(|_| AppError::Validation(format!("Invalid end time {} (HH:MM)", w.end)))?;
        windows.push(RequestedWindow {
            court_id: w.court_id.clone(),
            window: TimeWindow::new(start, end)?,
        });
    }

    let params = CreateReservationParams {
        venue_id,
        date,
        windows,
        customer_name: payload.name,
        customer_email: payload.email,
        customer_phone: payload.phone,
        total_price: payload.total_price,
        currency: payload.currency.unwrap_or_else(|| "VND".to_string()),
    };

    match state.reservation_service.create_reservation(params).await? {
        ReservationOutcome::Created { booking, slots, checkout_url } => {
            info!("Reservation confirmed pending payment: {}", booking.id);
            Ok(Json(ReservationResponse { booking, slots, checkout_url, duplicate: false }))
        }
        ReservationOutcome::Duplicate { booking, checkout_url } => {
            let slots = state.booking_repo.slots_for_booking(&booking.id).await?;
            Ok(Json(ReservationResponse { booking, slots, checkout_url, duplicate: true }))
        }
    }
}
