//! Authentication service
//!
//! Signup with emailed OTP, password and Google login, and refresh-token
//! rotation backed by the `refresh_tokens` table.

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::db::users::NewUser;
use crate::domain::aggregates::{Role, User};
use crate::domain::value_objects::EmailAddress;

use super::google::GoogleVerifier;
use super::jwt::{generate_token, verify_typed, Claims, TokenSubject, TokenType};
use super::otp::OtpStore;
use super::password::{hash_password, verify_password};
use super::AuthError;

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub email: EmailAddress,
    pub password: String,
    pub phone_number: Option<String>,
}

pub struct AuthService {
    db: PgPool,
    jwt_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_days: i64,
    otp: OtpStore,
    google: GoogleVerifier,
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config, http: reqwest::Client) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            access_ttl_seconds: config.jwt_access_token_ttl_seconds,
            refresh_ttl_days: config.jwt_refresh_token_ttl_days,
            otp: OtpStore::default(),
            google: GoogleVerifier::new(http, config.google_client_id.clone()),
        }
    }

    pub fn jwt_secret(&self) -> &str { self.jwt_secret.expose_secret() }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(verify_typed(token, self.jwt_secret(), TokenType::Access)?)
    }

    /// Parks a signup until the emailed code is confirmed. Returns the code.
    pub async fn begin_signup(&self, req: SignupRequest) -> Result<String, AuthError> {
        if db::users::email_exists(&self.db, req.email.as_str()).await? {
            return Err(AuthError::EmailTaken);
        }
        let password_hash = hash_password(&req.password).await?;
        let otp = self.otp.insert(req.username, req.email.into_inner(), password_hash, req.phone_number).await;
        Ok(otp)
    }

    pub async fn complete_signup(&self, email: &EmailAddress, otp: &str) -> Result<(User, AuthTokens), AuthError> {
        let pending = self.otp.verify(email.as_str(), otp).await?;
        let new_user = NewUser {
            email: pending.email,
            username: Some(pending.username),
            password_hash: Some(pending.password_hash),
            google_id: None,
            first_name: None,
            last_name: None,
            phone_number: pending.phone_number,
            profile_picture: None,
            role: Role::Customer,
        };
        let user = db::users::create(&self.db, &new_user).await.map_err(|e| match e {
            sqlx::Error::Database(ref d) if d.is_unique_violation() => AuthError::EmailTaken,
            other => AuthError::Database(other),
        })?;
        tracing::info!(user_id = %user.id, "Signup completed");
        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    /// Password login. `admin_only` rejects non-admin accounts.
    pub async fn login(&self, email: &EmailAddress, password: &str, admin_only: bool) -> Result<(User, AuthTokens), AuthError> {
        let user = db::users::find_by_email(&self.db, email.as_str()).await?.ok_or(AuthError::InvalidCredentials)?;
        let hash = user.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if admin_only && !user.is_admin() {
            return Err(AuthError::NotAdmin);
        }
        if user.is_blocked {
            return Err(AuthError::Blocked);
        }
        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    /// Finds the account by Google id, then by email (linking it), else creates one.
    pub async fn google_login(&self, id_token: &str) -> Result<(User, AuthTokens), AuthError> {
        let identity = self.google.verify(id_token).await?;
        let user = match db::users::find_by_google_id(&self.db, &identity.google_id).await? {
            Some(user) => user,
            None => match db::users::find_by_email(&self.db, &identity.email).await? {
                Some(user) => db::users::link_google(&self.db, user.id, &identity.google_id, identity.picture.as_deref()).await?,
                None => {
                    let new_user = NewUser {
                        username: Some(identity.email.split('@').next().unwrap_or_default().to_string()),
                        email: identity.email,
                        password_hash: None,
                        google_id: Some(identity.google_id),
                        first_name: identity.first_name,
                        last_name: identity.last_name,
                        phone_number: None,
                        profile_picture: identity.picture,
                        role: Role::Customer,
                    };
                    db::users::create(&self.db, &new_user).await?
                }
            },
        };
        if user.is_blocked {
            return Err(AuthError::Blocked);
        }
        let tokens = self.issue_tokens(&user).await?;
        Ok((user, tokens))
    }

    /// Rotates a refresh token: the presented jti is revoked and a new pair issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = verify_typed(refresh_token, self.jwt_secret(), TokenType::Refresh).map_err(|_| AuthError::InvalidRefreshToken)?;
        if !db::tokens::revoke(&self.db, &claims.jti).await? {
            return Err(AuthError::InvalidRefreshToken);
        }
        let user_id = claims.user_id().map_err(|_| AuthError::InvalidRefreshToken)?;
        let user = db::users::find_by_id(&self.db, user_id).await?.ok_or(AuthError::InvalidRefreshToken)?;
        if user.is_blocked {
            return Err(AuthError::Blocked);
        }
        self.issue_tokens(&user).await
    }

    /// Revokes the refresh token if it is one of ours. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Ok(claims) = verify_typed(refresh_token, self.jwt_secret(), TokenType::Refresh) {
            db::tokens::revoke(&self.db, &claims.jti).await?;
        }
        Ok(())
    }

    pub async fn revoke_user_sessions(&self, user_id: Uuid) -> Result<u64, AuthError> {
        Ok(db::tokens::revoke_all_for_user(&self.db, user_id).await?)
    }

    /// Creates the configured admin account if no user has that email yet.
    pub async fn seed_admin(&self, email: &str, password: &SecretString) -> Result<bool, AuthError> {
        let hash = hash_password(password.expose_secret()).await?;
        Ok(db::users::insert_admin_if_missing(&self.db, email, &hash).await?)
    }

    async fn issue_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let subject = TokenSubject { user_id: user.id, email: &user.email, role: user.role };
        let refresh_jti = Uuid::new_v4().to_string();
        let refresh_ttl = self.refresh_ttl_days * 24 * 60 * 60;

        let access_token = generate_token(&subject, &Uuid::new_v4().to_string(), self.jwt_secret(), self.access_ttl_seconds, TokenType::Access)?;
        let refresh_token = generate_token(&subject, &refresh_jti, self.jwt_secret(), refresh_ttl, TokenType::Refresh)?;
        db::tokens::insert(&self.db, &refresh_jti, user.id, Utc::now() + Duration::seconds(refresh_ttl)).await?;

        Ok(AuthTokens { access_token, refresh_token, token_type: "Bearer", expires_in: self.access_ttl_seconds })
    }
}
