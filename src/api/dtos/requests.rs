use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub owner_name: String,
}

#[derive(Deserialize)]
pub struct CreateCourtRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct WindowRequest {
    pub court_id: String,
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    /// "YYYY-MM-DD"
    pub date: String,
    pub windows: Vec<WindowRequest>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Minor currency units, computed upstream by the pricing layer.
    pub total_price: i64,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}
