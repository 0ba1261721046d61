//! Signup, login and token endpoints

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use super::{validated, ApiResponse, JsonBody};
use crate::auth::{AuthTokens, SignupRequest};
use crate::domain::aggregates::User;
use crate::domain::value_objects::EmailAddress;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupBody {
    #[validate(length(min = 1, max = 64, message = "Username is required"))]
    pub username: String,
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpBody {
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody { pub email: String, pub password: String }

#[derive(Debug, Deserialize, Validate)]
pub struct GoogleBody {
    #[validate(length(min = 1, message = "id_token is required"))]
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody { pub refresh_token: String }

#[derive(Debug, Serialize)]
pub struct Session { pub user: User, #[serde(flatten)] pub tokens: AuthTokens }

/// POST /api/auth/signup
pub async fn signup(State(s): State<AppState>, JsonBody(body): JsonBody<SignupBody>) -> ApiResult<(StatusCode, ApiResponse<Value>)> {
    let body = validated(body)?;
    let email = EmailAddress::parse(&body.email)?;
    let username = body.username.trim().to_string();
    let otp = s
        .auth
        .begin_signup(SignupRequest { username: username.clone(), email: email.clone(), password: body.password, phone_number: body.phone_number })
        .await?;
    if let Err(e) = s.email.send_signup_otp(email.as_str(), &username, &otp).await {
        tracing::error!(email = %email, error = %e, "Failed to send signup OTP");
    }
    Ok((StatusCode::CREATED, ApiResponse::with_message("OTP sent to email", json!({ "email": email.as_str() }))))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(State(s): State<AppState>, JsonBody(body): JsonBody<VerifyOtpBody>) -> ApiResult<(StatusCode, ApiResponse<Session>)> {
    let body = validated(body)?;
    let email = EmailAddress::parse(&body.email)?;
    let (user, tokens) = s.auth.complete_signup(&email, body.otp.trim()).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("User registered successfully", Session { user, tokens })))
}

/// POST /api/auth/login
pub async fn login(State(s): State<AppState>, JsonBody(body): JsonBody<LoginBody>) -> ApiResult<ApiResponse<Session>> {
    let email = EmailAddress::parse(&body.email)?;
    let (user, tokens) = s.auth.login(&email, &body.password, false).await?;
    Ok(ApiResponse::with_message("Login successful", Session { user, tokens }))
}

/// POST /api/auth/admin-login
pub async fn admin_login(State(s): State<AppState>, JsonBody(body): JsonBody<LoginBody>) -> ApiResult<ApiResponse<Session>> {
    let email = EmailAddress::parse(&body.email)?;
    let (user, tokens) = s.auth.login(&email, &body.password, true).await?;
    Ok(ApiResponse::with_message("Admin login successful", Session { user, tokens }))
}

/// POST /api/auth/google
pub async fn google(State(s): State<AppState>, JsonBody(body): JsonBody<GoogleBody>) -> ApiResult<ApiResponse<Session>> {
    let body = validated(body)?;
    let (user, tokens) = s.auth.google_login(&body.id_token).await?;
    Ok(ApiResponse::ok(Session { user, tokens }))
}

/// POST /api/auth/refresh
pub async fn refresh(State(s): State<AppState>, JsonBody(body): JsonBody<RefreshBody>) -> ApiResult<ApiResponse<AuthTokens>> {
    Ok(ApiResponse::ok(s.auth.refresh(&body.refresh_token).await?))
}

/// POST /api/auth/logout
pub async fn logout(State(s): State<AppState>, JsonBody(body): JsonBody<RefreshBody>) -> ApiResult<ApiResponse<Value>> {
    s.auth.logout(&body.refresh_token).await?;
    Ok(ApiResponse::with_message("Logged out", Value::Null))
}
