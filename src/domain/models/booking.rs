use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use rand::{distributions::Alphanumeric, Rng};

use crate::error::AppError;

pub mod booking_status {
    pub const PENDING_PAYMENT: &str = "PENDING_PAYMENT";
    pub const CONFIRMED: &str = "CONFIRMED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const EXPIRED: &str = "EXPIRED";
    pub const COMPLETED: &str = "COMPLETED";
}

pub mod booking_payment_status {
    pub const PENDING: &str = "PENDING";
    pub const PAID: &str = "PAID";
    pub const FAILED: &str = "FAILED";
    pub const REFUNDED: &str = "REFUNDED";
    pub const EXPIRED: &str = "EXPIRED";
}

/// Immutable snapshot of the venue/court/time context taken at creation time,
/// so the booking stays displayable even if the catalog is edited or deleted
/// later. Serialized into `context_json`; never re-read from the catalog.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingContext {
    pub venue_name: String,
    pub windows: Vec<ContextWindow>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextWindow {
    pub court_id: String,
    pub court_name: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub venue_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub payment_status: String,
    pub total_price: i64,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub context_json: String,
    pub reference_code: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub venue_id: String,
    pub date: NaiveDate,
    pub total_price: i64,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub context: BookingContext,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        let reference_code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect::<String>()
            .to_uppercase();

        Self {
            id: Uuid::new_v4().to_string(),
            venue_id: params.venue_id,
            date: params.date,
            status: booking_status::PENDING_PAYMENT.to_string(),
            payment_status: booking_payment_status::PENDING.to_string(),
            total_price: params.total_price,
            currency: params.currency,
            customer_name: params.customer_name,
            customer_email: params.customer_email,
            customer_phone: params.customer_phone,
            context_json: serde_json::to_string(&params.context).unwrap_or_else(|_| "{}".to_string()),
            reference_code,
            created_at: Utc::now(),
        }
    }

    pub fn context(&self) -> Result<BookingContext, AppError> {
        serde_json::from_str(&self.context_json)
            .map_err(|e| AppError::InternalWithMsg(format!("Corrupt booking context for {}: {}", self.id, e)))
    }

    pub fn is_pending_payment(&self) -> bool {
        self.status == booking_status::PENDING_PAYMENT
            && self.payment_status == booking_payment_status::PENDING
    }

    pub fn is_terminal(&self) -> bool {
        self.status == booking_status::CANCELLED || self.status == booking_status::EXPIRED
    }
}
