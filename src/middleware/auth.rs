//! Authentication extractors
//!
//! Bearer access tokens are verified statelessly; refresh tokens are the only
//! ones checked against the database.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthService, JwtError};
use crate::auth::AuthError;
use crate::domain::aggregates::Role;
use crate::error::ApiError;

/// Authenticated user extracted from the access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized("Authorization header with Bearer token required".to_string()))?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let claims = auth_service.verify_access_token(bearer.token()).map_err(|e| match e {
            AuthError::Token(JwtError::TokenExpired) => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })?;

        let user_id = claims.user_id().map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;
        let role = claims.role().map_err(|_| ApiError::Unauthorized("Invalid role in token".to_string()))?;

        Ok(AuthenticatedUser { user_id, email: claims.email, role })
    }
}

/// Authenticates when a token is present; never rejects.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(AuthenticatedUser::from_request_parts(parts, state).await.ok()))
    }
}

/// Requires the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
