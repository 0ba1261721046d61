//! Google ID-token verification through the tokeninfo endpoint

use serde::Deserialize;

use super::AuthError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Fields of the tokeninfo response that matter here. Google sends booleans as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub aud: String,
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
    endpoint: String,
}

impl GoogleVerifier {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self { http, client_id, endpoint: TOKENINFO_URL.to_string() }
    }

    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AuthError> {
        let client_id = self.client_id.as_deref().ok_or(AuthError::GoogleNotConfigured)?;
        let response = self.http.get(&self.endpoint).query(&[("id_token", id_token)]).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::InvalidGoogleToken(format!("tokeninfo returned {}", response.status())));
        }
        let info: TokenInfo = response.json().await?;
        check_token_info(info, client_id)
    }
}

pub fn check_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, AuthError> {
    if info.aud != client_id {
        return Err(AuthError::InvalidGoogleToken("audience mismatch".to_string()));
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(AuthError::InvalidGoogleToken("email not verified".to_string()));
    }
    let email = info.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::InvalidGoogleToken("email missing".to_string()))?;
    Ok(GoogleIdentity { google_id: info.sub, email, first_name: info.given_name, last_name: info.family_name, picture: info.picture })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: Option<&str>) -> TokenInfo {
        TokenInfo {
            aud: aud.into(), sub: "1234567890".into(), email: Some("Jane@Gmail.com".into()),
            email_verified: verified.map(str::to_string), given_name: Some("Jane".into()), family_name: None, picture: None,
        }
    }

    #[test]
    fn test_accepts_matching_audience() {
        let identity = check_token_info(info("client-1", Some("true")), "client-1").unwrap();
        assert_eq!(identity.email, "jane@gmail.com");
        assert_eq!(identity.google_id, "1234567890");
    }

    #[test]
    fn test_rejects_bad_tokens() {
        assert!(matches!(check_token_info(info("client-2", Some("true")), "client-1"), Err(AuthError::InvalidGoogleToken(_))));
        assert!(check_token_info(info("client-1", Some("false")), "client-1").is_err());
        assert!(check_token_info(info("client-1", None), "client-1").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let verifier = GoogleVerifier::new(reqwest::Client::new(), None);
        assert!(matches!(verifier.verify("token").await, Err(AuthError::GoogleNotConfigured)));
    }
}
