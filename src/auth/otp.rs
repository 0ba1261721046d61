//! Pending signups awaiting their emailed one-time code

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::RwLock;

use super::AuthError;

pub const OTP_TTL_SECONDS: i64 = 120;

/// A signup held until its OTP is confirmed. The password is already hashed.
#[derive(Debug, Clone)]
pub struct PendingSignup {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct OtpStore {
    pending: RwLock<HashMap<String, PendingSignup>>,
    ttl: Duration,
}

impl Default for OtpStore {
    fn default() -> Self { Self::new(Duration::seconds(OTP_TTL_SECONDS)) }
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self { Self { pending: RwLock::new(HashMap::new()), ttl } }

    /// Stores a signup under its email, replacing any earlier one, and returns the code to send.
    pub async fn insert(&self, username: String, email: String, password_hash: String, phone_number: Option<String>) -> String {
        let now = Utc::now();
        let otp = generate_otp();
        let signup = PendingSignup { username, email: email.clone(), password_hash, phone_number, otp: otp.clone(), expires_at: now + self.ttl };
        let mut pending = self.pending.write().await;
        pending.retain(|_, s| s.expires_at > now);
        pending.insert(email, signup);
        otp
    }

    /// Consumes the pending signup when the code matches and has not expired.
    pub async fn verify(&self, email: &str, otp: &str) -> Result<PendingSignup, AuthError> {
        let mut pending = self.pending.write().await;
        let signup = pending.get(email).ok_or(AuthError::PendingSignupNotFound)?;
        if signup.expires_at <= Utc::now() {
            pending.remove(email);
            return Err(AuthError::OtpExpired);
        }
        if signup.otp != otp.trim() { return Err(AuthError::InvalidOtp); }
        pending.remove(email).ok_or(AuthError::PendingSignupNotFound)
    }

    pub async fn len(&self) -> usize { self.pending.read().await.len() }
}

/// Six-digit numeric code.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(ttl: Duration) -> (OtpStore, String) {
        let store = OtpStore::new(ttl);
        let otp = store.insert("jane".into(), "jane@example.com".into(), "hash".into(), None).await;
        (store, otp)
    }

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_verify_consumes_entry() {
        let (store, otp) = store_with(Duration::seconds(120)).await;
        let signup = store.verify("jane@example.com", &otp).await.unwrap();
        assert_eq!(signup.username, "jane");
        assert!(matches!(store.verify("jane@example.com", &otp).await, Err(AuthError::PendingSignupNotFound)));
    }

    #[tokio::test]
    async fn test_mismatch_keeps_entry() {
        let (store, otp) = store_with(Duration::seconds(120)).await;
        let wrong = if otp == "123456" { "654321" } else { "123456" };
        assert!(matches!(store.verify("jane@example.com", wrong).await, Err(AuthError::InvalidOtp)));
        assert!(store.verify("jane@example.com", &otp).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_code() {
        let (store, otp) = store_with(Duration::seconds(-1)).await;
        assert!(matches!(store.verify("jane@example.com", &otp).await, Err(AuthError::OtpExpired)));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_insert_purges_expired() {
        let (store, _) = store_with(Duration::seconds(-1)).await;
        store.insert("joe".into(), "joe@example.com".into(), "hash".into(), None).await;
        assert_eq!(store.len().await, 1);
    }
}
