use crate::domain::models::payment::ObservedPaymentStatus;
use crate::domain::ports::{CheckoutRequest, CheckoutSession, GatewaySession, PaymentGateway};
use crate::error::AppError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

pub struct HttpPaymentGateway {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        let res = self.client.post(format!("{}/checkout/sessions", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment gateway connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment gateway rejected checkout session. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        res.json::<CheckoutSession>().await.map_err(|e| {
            AppError::InternalWithMsg(format!("Malformed checkout session response: {}", e))
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<GatewaySession, AppError> {
        let res = self.client.get(format!("{}/checkout/sessions/{}", self.api_url, session_id))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment gateway connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment gateway session lookup failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        res.json::<GatewaySession>().await.map_err(|e| {
            AppError::InternalWithMsg(format!("Malformed gateway session response: {}", e))
        })
    }
}

/// Gateway callback envelope. The raw body must be verified with
/// `verify_webhook_signature` before being deserialized into this.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub booking_id: Option<String>,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub payment_status: Option<String>,
}

impl WebhookEvent {
    /// Maps the gateway's event vocabulary onto the reconciler's observed
    /// status. Unknown event kinds return None and are acknowledged without
    /// any state change.
    pub fn observed_status(&self) -> Option<ObservedPaymentStatus> {
        match self.event_type.as_str() {
            "checkout.session.completed" => {
                if self.data.payment_status.as_deref() == Some("paid") {
                    Some(ObservedPaymentStatus::Captured)
                } else {
                    Some(ObservedPaymentStatus::CompletedUnpaid)
                }
            }
            "checkout.session.async_payment_succeeded" => Some(ObservedPaymentStatus::Captured),
            "checkout.session.expired" => Some(ObservedPaymentStatus::SessionExpired),
            "checkout.session.pending" => Some(ObservedPaymentStatus::Pending),
            "payment_intent.succeeded" => Some(ObservedPaymentStatus::Captured),
            "payment_intent.failed" => Some(ObservedPaymentStatus::AttemptFailed),
            _ => None,
        }
    }
}

/// Verifies the `t=<unix>,v1=<hex>` signature header over `"{t}.{body}"`
/// with HMAC-SHA256. Comparison is constant-time via `verify_slice`.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let mut timestamp = None;
    let mut provided = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => provided = Some(v),
            _ => {}
        }
    }
    let (Some(timestamp), Some(provided)) = (timestamp, provided) else {
        return false;
    };
    let Ok(expected) = hex::decode(provided) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Counterpart of `verify_webhook_signature`, used by tests and tooling to
/// produce a header the verifier accepts.
pub fn sign_webhook_payload(secret: &str, timestamp: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip_verifies() {
        let header = sign_webhook_payload("whsec_test", "1700000000", b"{\"id\":\"evt_1\"}");
        assert!(verify_webhook_signature("whsec_test", b"{\"id\":\"evt_1\"}", &header));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let header = sign_webhook_payload("whsec_test", "1700000000", b"{\"id\":\"evt_1\"}");
        assert!(!verify_webhook_signature("whsec_test", b"{\"id\":\"evt_2\"}", &header));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let header = sign_webhook_payload("whsec_test", "1700000000", b"{}");
        assert!(!verify_webhook_signature("whsec_other", b"{}", &header));
    }

    #[test]
    fn malformed_header_fails_verification() {
        assert!(!verify_webhook_signature("whsec_test", b"{}", "garbage"));
        assert!(!verify_webhook_signature("whsec_test", b"{}", "t=123"));
        assert!(!verify_webhook_signature("whsec_test", b"{}", "t=123,v1=nothex"));
    }
}
