use axum::{extract::{Path, Query, State}, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use crate::api::dtos::requests::SlotsQuery;
use crate::error::AppError;
use crate::state::AppState;

/// Advisory read of the occupied windows on one court. Callers render free
/// time from the gaps; the authoritative conflict check happens under locks
/// when a reservation is actually created.
pub async fn list_court_slots(
    State(state): State<Arc<AppState>>,
    Path(court_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;

    state.catalog_repo.find_court(&court_id).await?
        .ok_or(AppError::NotFound("Court not found".into()))?;

    let slots = state.booking_repo.list_slots(&court_id, date).await?;
    Ok(Json(json!({
        "court_id": court_id,
        "date": query.date,
        "slots": slots,
    })))
}
