use crate::domain::models::booking::Booking;
use crate::domain::ports::NotificationService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::error;

pub struct HttpNotificationService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpNotificationService {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }

    async fn post(&self, payload: &NotifyPayload<'_>) -> Result<(), AppError> {
        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Notification service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Notification service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct NotifyPayload<'a> {
    event: &'a str,
    booking_id: &'a str,
    reference_code: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    reason: Option<&'a str>,
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn notify_booking_confirmed(&self, booking: &Booking) -> Result<(), AppError> {
        self.post(&NotifyPayload {
            event: "booking_confirmed",
            booking_id: &booking.id,
            reference_code: &booking.reference_code,
            customer_name: &booking.customer_name,
            customer_email: &booking.customer_email,
            reason: None,
        }).await
    }

    async fn notify_booking_cancelled(&self, booking: &Booking, reason: &str) -> Result<(), AppError> {
        self.post(&NotifyPayload {
            event: "booking_cancelled",
            booking_id: &booking.id,
            reference_code: &booking.reference_code,
            customer_name: &booking.customer_name,
            customer_email: &booking.customer_email,
            reason: Some(reason),
        }).await
    }
}
