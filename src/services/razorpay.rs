//! Razorpay orders API and signature checks
//!
//! Checkout signatures are HMAC-SHA256 over `order_id|payment_id` keyed with
//! the API secret; webhook signatures are HMAC-SHA256 of the raw body keyed
//! with the webhook secret. Both arrive hex encoded.

use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::RazorpayConfig;
use crate::domain::value_objects::{Money, MoneyError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Razorpay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Razorpay returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Amount(#[from] MoneyError),
}

/// Order as returned by `POST /v1/orders`. Amount is in paise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookEntity<PaymentEntity>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntity<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<i64>,
}

impl WebhookEvent {
    pub fn payment(&self) -> Option<&PaymentEntity> { self.payload.payment.as_ref().map(|p| &p.entity) }
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn verify(secret: &str, message: &[u8], signature_hex: &str) -> Result<(), PaymentError> {
    let signature = hex::decode(signature_hex.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(message);
    mac.verify_slice(&signature).map_err(|_| PaymentError::InvalidSignature)
}

pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError> {
    verify(secret, format!("{}|{}", order_id, payment_id).as_bytes(), signature)
}

pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), PaymentError> {
    verify(secret, body, signature)
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    config: Option<RazorpayConfig>,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, config: Option<RazorpayConfig>) -> Self { Self { http, config } }

    fn config(&self) -> Result<&RazorpayConfig, PaymentError> { self.config.as_ref().ok_or(PaymentError::NotConfigured("Razorpay")) }

    pub fn key_id(&self) -> Result<&str, PaymentError> { Ok(&self.config()?.key_id) }

    #[tracing::instrument(skip(self, amount), fields(amount = %amount))]
    pub async fn create_order(&self, amount: &Money, receipt: &str) -> Result<RazorpayOrder, PaymentError> {
        let config = self.config()?;
        let body = CreateOrderBody { amount: amount.to_minor_units()?, currency: amount.currency(), receipt, payment_capture: 1 };
        let response = self
            .http
            .post(format!("{}/v1/orders", config.api_base))
            .basic_auth(&config.key_id, Some(config.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api { status: status.as_u16(), message });
        }
        let order: RazorpayOrder = response.json().await?;
        tracing::info!(razorpay_order_id = %order.id, receipt = %receipt, "Razorpay order created");
        Ok(order)
    }

    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<(), PaymentError> {
        verify_payment_signature(self.config()?.key_secret.expose_secret(), order_id, payment_id, signature)
    }

    pub fn verify_webhook(&self, body: &[u8], signature: &str) -> Result<(), PaymentError> {
        let secret = self.config()?.webhook_secret.as_ref().ok_or(PaymentError::NotConfigured("Razorpay webhook secret"))?;
        verify_webhook_signature(secret.expose_secret(), body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sign("key", b"The quick brown fox jumps over the lazy dog"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_payment_signature() {
        let signature = sign("secret", b"order_1|pay_1");
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &signature).is_ok());
        assert!(verify_payment_signature("secret", "order_1", "pay_2", &signature).is_err());
        assert!(verify_payment_signature("other", "order_1", "pay_1", &signature).is_err());
        assert!(matches!(verify_payment_signature("secret", "order_1", "pay_1", "zz-not-hex"), Err(PaymentError::InvalidSignature)));
    }

    #[test]
    fn test_webhook_signature() {
        let body = br#"{"event":"payment.failed"}"#;
        let signature = sign("whsec", body);
        assert!(verify_webhook_signature("whsec", body, &signature).is_ok());
        assert!(verify_webhook_signature("whsec", b"{}", &signature).is_err());
    }

    #[test]
    fn test_webhook_payload() {
        let raw = r#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1","status":"captured","amount":12350}}}}"#;
        let event: WebhookEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.payment().unwrap().order_id.as_deref(), Some("order_1"));
        let bare: WebhookEvent = serde_json::from_str(r#"{"event":"refund.created"}"#).unwrap();
        assert!(bare.payment().is_none());
    }

    #[test]
    fn test_unconfigured_client() {
        let client = RazorpayClient::new(reqwest::Client::new(), None);
        assert!(matches!(client.key_id(), Err(PaymentError::NotConfigured(_))));
    }
}
