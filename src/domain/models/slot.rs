use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

/// Slot occupancy states. Slots are created RESERVED and pre-bound to their
/// booking inside the reservation transaction; payment capture promotes them
/// to BOOKED. MAINTENANCE slots belong to no booking but still occupy their
/// window for conflict purposes. Free time has no row at all.
pub mod slot_status {
    pub const RESERVED: &str = "RESERVED";
    pub const BOOKED: &str = "BOOKED";
    pub const MAINTENANCE: &str = "MAINTENANCE";
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Slot {
    pub id: String,
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn reserved(court_id: String, date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime, booking_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            court_id,
            date,
            start_time,
            end_time,
            status: slot_status::RESERVED.to_string(),
            booking_id: Some(booking_id),
            created_at: Utc::now(),
        }
    }
}
