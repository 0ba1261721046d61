//! JWT token generation and validation
//!
//! Access and refresh tokens share one secret and one claim layout; the
//! `token_type` claim keeps them from being swapped.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::Role;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Expected {0} token")]
    WrongTokenType(&'static str),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub role: String,
    /// JWT ID, the refresh-token table key
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }

    pub fn role(&self) -> Result<Role, JwtError> {
        self.role.parse::<Role>().map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Who a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub role: Role,
}

pub fn generate_token(
    subject: &TokenSubject<'_>,
    jti: &str,
    secret: &str,
    ttl_seconds: i64,
    token_type: TokenType,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: subject.user_id.to_string(),
        email: subject.email.to_string(),
        role: subject.role.as_str().to_string(),
        jti: jti.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: token_type.as_str().to_string(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify signature and expiry and decode the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::InvalidToken(e.to_string()),
        }
    })?;

    Ok(token_data.claims)
}

/// [`verify_token`] plus a check on the `token_type` claim.
pub fn verify_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = verify_token(token, secret)?;
    if claims.token_type != expected.as_str() {
        return Err(JwtError::WrongTokenType(expected.as_str()));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    fn subject() -> TokenSubject<'static> {
        TokenSubject { user_id: Uuid::new_v4(), email: "jane@example.com", role: Role::Customer }
    }

    #[test]
    fn test_roundtrip() {
        let subject = subject();
        let jti = Uuid::new_v4().to_string();
        let token = generate_token(&subject, &jti, SECRET, 900, TokenType::Access).unwrap();
        let claims = verify_typed(&token, SECRET, TokenType::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), subject.user_id);
        assert_eq!(claims.role().unwrap(), Role::Customer);
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.jti, jti);
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_token(&subject(), "jti", SECRET, 900, TokenType::Access).unwrap();
        assert!(matches!(verify_token(&token, "other-secret"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_expired() {
        let token = generate_token(&subject(), "jti", SECRET, -120, TokenType::Access).unwrap();
        assert!(matches!(verify_token(&token, SECRET), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_token_type_enforced() {
        let refresh = generate_token(&subject(), "jti", SECRET, 900, TokenType::Refresh).unwrap();
        assert!(matches!(verify_typed(&refresh, SECRET, TokenType::Access), Err(JwtError::WrongTokenType("access"))));
        assert!(verify_typed(&refresh, SECRET, TokenType::Refresh).is_ok());
    }
}
