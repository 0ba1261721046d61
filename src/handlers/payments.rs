//! Razorpay callbacks for signed-in customers and guests, plus the server-to-server webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{validated, ApiResponse, JsonBody};
use crate::domain::aggregates::{Address, GuestInfo, Order};
use crate::domain::value_objects::EmailAddress;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::services::{LineSelection, PaymentConfirmation, PlacedOrder};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Debug, Deserialize, Validate)]
pub struct GuestDetails {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[validate(length(min = 7, max = 20, message = "Invalid phone number"))]
    pub phone: String,
}

impl GuestDetails {
    fn trimmed(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email,
            phone: self.phone.trim().to_string(),
        }
    }
}

/// Trims before the length rules run; the email goes through [`EmailAddress::parse`].
impl TryFrom<GuestDetails> for GuestInfo {
    type Error = ApiError;

    fn try_from(details: GuestDetails) -> Result<Self, Self::Error> {
        let g = validated(details.trimmed())?;
        let email = EmailAddress::parse(&g.email)?;
        Ok(GuestInfo { first_name: g.first_name, last_name: g.last_name, email: email.into_inner(), phone: g.phone })
    }
}

#[derive(Debug, Deserialize)]
pub struct GuestCheckoutBody {
    pub items: Vec<LineSelection>,
    pub guest_info: GuestDetails,
    pub shipping_address: Address,
}

/// POST /api/payment/verify
pub async fn verify(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<PaymentConfirmation>) -> ApiResult<ApiResponse<Order>> {
    let order = s.checkout.verify_payment(Some(user.user_id), body).await?;
    Ok(ApiResponse::with_message("Payment verified successfully", order))
}

/// POST /api/payment/guest/checkout
pub async fn guest_checkout(State(s): State<AppState>, JsonBody(body): JsonBody<GuestCheckoutBody>) -> ApiResult<(StatusCode, ApiResponse<PlacedOrder>)> {
    let guest = GuestInfo::try_from(body.guest_info)?;
    let placed = s.checkout.checkout_guest(body.items, guest, body.shipping_address).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Order created successfully", placed)))
}

/// POST /api/payment/guest/verify
pub async fn guest_verify(State(s): State<AppState>, JsonBody(body): JsonBody<PaymentConfirmation>) -> ApiResult<ApiResponse<Order>> {
    let order = s.checkout.verify_payment(None, body).await?;
    Ok(ApiResponse::with_message("Payment verified successfully", order))
}

/// POST /api/payment/webhook. Takes the raw body so the signature can be checked over the exact bytes.
pub async fn webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<ApiResponse<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing X-Razorpay-Signature header".to_string()))?;
    s.checkout.handle_webhook(&body, signature).await?;
    Ok(ApiResponse::ok(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_details_normalized() {
        let details = GuestDetails {
            first_name: " Asha ".into(),
            last_name: "Menon".into(),
            email: " Asha@Example.COM ".into(),
            phone: " 9876543210 ".into(),
        };
        let guest = GuestInfo::try_from(details).unwrap();
        assert_eq!(guest.first_name, "Asha");
        assert_eq!(guest.email, "asha@example.com");
        assert_eq!(guest.phone, "9876543210");
    }

    #[test]
    fn test_guest_email_with_surrounding_spaces_is_accepted() {
        let details = GuestDetails { first_name: "Asha".into(), last_name: "".into(), email: " a@b.com ".into(), phone: "9876543210".into() };
        assert_eq!(GuestInfo::try_from(details).unwrap().email, "a@b.com");
    }

    #[test]
    fn test_guest_details_validation() {
        let details = GuestDetails { first_name: "".into(), last_name: "".into(), email: "nope".into(), phone: "1".into() };
        let errors = details.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
        assert!(errors.field_errors().contains_key("phone"));

        let blank_name = GuestDetails { first_name: "   ".into(), last_name: "".into(), email: "a@b.com".into(), phone: "9876543210".into() };
        assert!(matches!(GuestInfo::try_from(blank_name), Err(ApiError::Validation(_))));
        let bad_email = GuestDetails { first_name: "Asha".into(), last_name: "".into(), email: "nope".into(), phone: "9876543210".into() };
        assert!(matches!(GuestInfo::try_from(bad_email), Err(ApiError::BadRequest(_))));
    }
}
