use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Mirrors the gateway's session lifecycle, not the booking's.
pub mod payment_status {
    pub const PENDING: &str = "PENDING";
    pub const SUCCEEDED: &str = "SUCCEEDED";
    pub const FAILED: &str = "FAILED";
    pub const EXPIRED: &str = "EXPIRED";
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub checkout_url: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(booking_id: String, session_id: String, checkout_url: String, amount: i64, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id,
            session_id: Some(session_id),
            payment_intent_id: None,
            checkout_url: Some(checkout_url),
            amount,
            currency,
            status: payment_status::PENDING.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a gateway event or a session poll tells us about the money,
/// normalized so webhook and manual-sync reconciliation share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedPaymentStatus {
    /// Payment captured; the booking can be finalized.
    Captured,
    /// Checkout completed but funds not captured yet; keep polling.
    CompletedUnpaid,
    /// The checkout session expired without payment.
    SessionExpired,
    /// A payment attempt failed; the session may still allow a retry.
    AttemptFailed,
    /// Nothing decided yet.
    Pending,
}

/// Which trigger produced the observation. Tagged into every reconciliation
/// log line so webhook-driven and poll-driven transitions stay auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSyncSource {
    Webhook,
    ManualSync,
}

impl std::fmt::Display for PaymentSyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentSyncSource::Webhook => write!(f, "webhook"),
            PaymentSyncSource::ManualSync => write!(f, "manual_sync"),
        }
    }
}
