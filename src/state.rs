use std::sync::Arc;
use crate::domain::ports::{
    BookingRepository, CatalogRepository, NotificationService, PaymentGateway, PaymentRepository,
};
use crate::domain::services::reconciler::PaymentReconciler;
use crate::domain::services::reservation::ReservationService;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog_repo: Arc<dyn CatalogRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub notification_service: Arc<dyn NotificationService>,
    pub reservation_service: Arc<ReservationService>,
    pub reconciler: Arc<PaymentReconciler>,
}
