use serde::Serialize;

use crate::domain::models::{booking::Booking, payment::Payment, slot::Slot};

#[derive(Serialize)]
pub struct ReservationResponse {
    pub booking: Booking,
    pub slots: Vec<Slot>,
    pub checkout_url: Option<String>,
    /// True when an equivalent recent submission was returned instead of a
    /// freshly created booking.
    pub duplicate: bool,
}

#[derive(Serialize)]
pub struct BookingDetailResponse {
    pub booking: Booking,
    pub slots: Vec<Slot>,
    pub payment: Option<Payment>,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub booking_id: String,
    pub outcome: &'static str,
}
