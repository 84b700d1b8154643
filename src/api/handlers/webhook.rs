use axum::{body::Bytes, extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::models::payment::PaymentSyncSource;
use crate::error::AppError;
use crate::infra::gateway::http_payment_gateway::{verify_webhook_signature, WebhookEvent};
use crate::state::AppState;

/// Inbound gateway callback. Everything after signature verification must
/// end in a success acknowledgment unless the state transition itself failed
/// durably; returning an error here makes the gateway retry-storm.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers.get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !verify_webhook_signature(&state.config.payment_webhook_secret, &body, signature) {
        warn!("Webhook rejected: bad signature");
        return Err(AppError::Unauthorized);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {}", e)))?;

    info!(event_id = %event.id, event_type = %event.event_type, "Webhook received");

    let Some(observed) = event.observed_status() else {
        return Ok(Json(json!({ "received": true, "outcome": "ignored_event_type" })));
    };

    let booking_id = match resolve_booking_id(&state, &event).await? {
        Some(id) => id,
        None => {
            warn!(event_id = %event.id, "Webhook references no known booking, acknowledging");
            return Ok(Json(json!({ "received": true, "outcome": "unknown_booking" })));
        }
    };

    if event.data.session_id.is_some() || event.data.payment_intent_id.is_some() {
        state.payment_repo.annotate_refs(
            &booking_id,
            event.data.session_id.as_deref(),
            event.data.payment_intent_id.as_deref(),
        ).await?;
    }

    match state.reconciler.apply_payment_status(&booking_id, observed, PaymentSyncSource::Webhook).await {
        Ok(outcome) => Ok(Json(json!({ "received": true, "outcome": outcome.as_str() }))),
        Err(AppError::NotFound(msg)) => {
            warn!(event_id = %event.id, "Webhook reconciliation skipped: {}", msg);
            Ok(Json(json!({ "received": true, "outcome": "unknown_booking" })))
        }
        Err(e) => Err(e),
    }
}

async fn resolve_booking_id(state: &Arc<AppState>, event: &WebhookEvent) -> Result<Option<String>, AppError> {
    if let Some(id) = &event.data.booking_id {
        return Ok(Some(id.clone()));
    }
    if let Some(session_id) = &event.data.session_id {
        if let Some(payment) = state.payment_repo.find_by_session(session_id).await? {
            return Ok(Some(payment.booking_id));
        }
    }
    Ok(None)
}
