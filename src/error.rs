//! API error type and its HTTP mapping
//!
//! Every handler returns [`ApiResult`]. Failures render as
//! `{"success": false, "message": ..., "code": ...}` with the matching status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthError, JwtError};
use crate::domain::aggregates::{
    AddressError, BannerError, CartError, CategoryError, OfferError, OrderError, ProductError, ReviewError,
};
use crate::domain::value_objects::{EmailError as EmailAddressError, MoneyError, SlugError};
use crate::domain::ParseEnumError;
use crate::services::{EmailError, InvoiceError, MediaError, PaymentError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn not_found(what: &str) -> Self { ApiError::NotFound(format!("{} not found", what)) }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Database(_) | ApiError::ExternalService(_) | ApiError::Internal(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Server-side details stay in the logs
        let message = if self.is_server_error() {
            tracing::error!(error = %self, code = %code, "Server error occurred");
            match &self {
                ApiError::ExternalService(_) => "Upstream service failed".to_string(),
                _ => "Server error".to_string(),
            }
        } else {
            tracing::debug!(error = %self, code = %code, "Client error occurred");
            self.to_string()
        };

        (status, Json(ErrorResponse { success: false, message, code })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict(format!("Duplicate value violates {}", db.constraint().unwrap_or("a unique constraint")))
            }
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self { ApiError::Validation(err.to_string()) }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self { ApiError::ExternalService(err.to_string()) }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self { ApiError::BadRequest(format!("Invalid JSON: {}", err)) }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self { ApiError::BadRequest(err.body_text()) }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self { ApiError::BadRequest(format!("Invalid multipart body: {}", err)) }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::VariantNotFound(_) => ApiError::NotFound(err.to_string()),
            ProductError::InsufficientStock { .. } => ApiError::Conflict(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ItemNotFound | CartError::Empty => ApiError::NotFound(err.to_string()),
            CartError::InvalidQuantity => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::ItemNotFound(_) => ApiError::NotFound(err.to_string()),
            OrderError::InvalidTransition { .. }
            | OrderError::InvalidReturnTransition { .. }
            | OrderError::CannotCancel
            | OrderError::AlreadyPaid
            | OrderError::AwaitingPayment => ApiError::Conflict(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::DuplicateSubcategory(_) => ApiError::Conflict(err.to_string()),
            CategoryError::SubcategoryNotFound(_) => ApiError::NotFound(err.to_string()),
            CategoryError::MissingName => ApiError::BadRequest(err.to_string()),
        }
    }
}

macro_rules! bad_request_from {
    ($($ty:ty),+ $(,)?) => {
        $(impl From<$ty> for ApiError {
            fn from(err: $ty) -> Self { ApiError::BadRequest(err.to_string()) }
        })+
    };
}

bad_request_from!(OfferError, ReviewError, BannerError, AddressError, EmailAddressError, SlugError, ParseEnumError);

impl From<MoneyError> for ApiError {
    fn from(err: MoneyError) -> Self { ApiError::Internal(err.to_string()) }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken | AuthError::InvalidOtp | AuthError::OtpExpired => ApiError::BadRequest(err.to_string()),
            AuthError::PendingSignupNotFound => ApiError::NotFound(err.to_string()),
            AuthError::InvalidCredentials | AuthError::NotAdmin | AuthError::InvalidGoogleToken(_) => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Blocked | AuthError::InvalidRefreshToken => ApiError::Forbidden(err.to_string()),
            AuthError::GoogleNotConfigured => ApiError::BadRequest(err.to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Hashing(_) => ApiError::Internal(err.to_string()),
            AuthError::Database(e) => e.into(),
            AuthError::Http(e) => e.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => ApiError::BadRequest(err.to_string()),
            PaymentError::NotConfigured(_) => ApiError::Internal(err.to_string()),
            _ => ApiError::ExternalService(err.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidFile(_) => ApiError::BadRequest(err.to_string()),
            MediaError::NotConfigured => ApiError::Internal(err.to_string()),
            _ => ApiError::ExternalService(err.to_string()),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidAddress(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::ExternalService(err.to_string()),
        }
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self { ApiError::Internal(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("Order").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ExternalService("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::Database("x".into()).error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_domain_error_mapping() {
        let stock: ApiError = ProductError::InsufficientStock { variant: "50ml".into(), available: 1 }.into();
        assert_eq!(stock.status_code(), StatusCode::CONFLICT);
        let cart: ApiError = CartError::Empty.into();
        assert_eq!(cart.status_code(), StatusCode::NOT_FOUND);
        let dup: ApiError = CategoryError::DuplicateSubcategory("Toners".into()).into();
        assert_eq!(dup.status_code(), StatusCode::CONFLICT);
        let missing: ApiError = CategoryError::SubcategoryNotFound(Uuid::nil()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        let shipped: ApiError = OrderError::TrackingRequired.into();
        assert_eq!(shipped.status_code(), StatusCode::BAD_REQUEST);
        let blocked: ApiError = AuthError::Blocked.into();
        assert_eq!(blocked.status_code(), StatusCode::FORBIDDEN);
        let unpaid: ApiError = OrderError::AwaitingPayment.into();
        assert_eq!(unpaid.status_code(), StatusCode::CONFLICT);
        let sig: ApiError = PaymentError::InvalidSignature.into();
        assert_eq!(sig.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_row_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_hides_server_details() {
        let response = ApiError::Database("connection refused on 10.0.0.5".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "DATABASE_ERROR");
        assert_eq!(body["message"], "Server error");
    }
}
