//! Authentication: passwords, tokens, signup codes and Google sign-in.

use thiserror::Error;

pub mod google;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod service;

pub use jwt::{verify_token, Claims, JwtError, TokenType};
pub use service::{AuthService, AuthTokens, SignupRequest};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email already exists")]
    EmailTaken,

    #[error("No pending signup for this email")]
    PendingSignupNotFound,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Admin access required")]
    NotAdmin,

    #[error("Account is blocked")]
    Blocked,

    #[error("Invalid or revoked refresh token")]
    InvalidRefreshToken,

    #[error("Invalid Google token: {0}")]
    InvalidGoogleToken(String),

    #[error("Google sign-in is not configured")]
    GoogleNotConfigured,

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
