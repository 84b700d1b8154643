use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{CreateCourtRequest, CreateVenueRequest};
use crate::domain::models::venue::{Court, Venue};
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVenueRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Venue name is required".into()));
    }

    let venue = Venue::new(payload.name, payload.owner_name);
    let created = state.catalog_repo.create_venue(&venue).await?;
    info!("Venue created: {}", created.id);
    Ok(Json(created))
}

pub async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let venue = state.catalog_repo.find_venue(&venue_id).await?
        .ok_or(AppError::NotFound("Venue not found".into()))?;
    Ok(Json(venue))
}

pub async fn create_court(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Json(payload): Json<CreateCourtRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Court name is required".into()));
    }

    state.catalog_repo.find_venue(&venue_id).await?
        .ok_or(AppError::NotFound("Venue not found".into()))?;

    let court = Court::new(venue_id, payload.name);
    let created = state.catalog_repo.create_court(&court).await?;
    info!("Court created: {} in venue {}", created.id, created.venue_id);
    Ok(Json(created))
}

pub async fn list_courts(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog_repo.find_venue(&venue_id).await?
        .ok_or(AppError::NotFound("Venue not found".into()))?;

    let courts = state.catalog_repo.list_courts(&venue_id).await?;
    Ok(Json(courts))
}
