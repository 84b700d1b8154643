pub mod duplicate;
pub mod overlap;
pub mod reconciler;
pub mod reservation;
