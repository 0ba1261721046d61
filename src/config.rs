//! Configuration management
//!
//! Settings come from environment variables, with a `.env` file honoured when
//! present. Everything except `DATABASE_URL` has a development default;
//! production refuses to start with the development JWT secret.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid environment: '{0}'. Expected: dev, staging, or prod")]
    InvalidEnvironment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool { matches!(self, Environment::Production) }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    pub webhook_secret: Option<SecretString>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

/// Admin account created at boot when missing.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub environment: Environment,
    pub port: u16,
    pub db_max_connections: u32,
    pub log_level: String,

    pub jwt_secret: SecretString,
    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,
    pub jwt_refresh_token_ttl_days: i64,

    pub razorpay: Option<RazorpayConfig>,
    pub smtp: SmtpConfig,
    pub cloudinary: Option<CloudinaryConfig>,
    pub google_client_id: Option<String>,
    pub nats_url: Option<String>,

    /// Base URL used in links sent by email.
    pub public_base_url: String,
    pub cors_allowed_origins: Option<String>,

    pub shipping_fee: Decimal,
    pub pending_order_ttl_minutes: i64,
    pub cleanup_interval_secs: u64,

    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("ENVIRONMENT") {
            Some(v) => v.parse::<Environment>()?,
            None => Environment::Development,
        };

        let database_url = get("DATABASE_URL").ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string())),
            None => DEV_JWT_SECRET.to_string(),
        };

        let razorpay = match (get("RAZORPAY_KEY_ID"), get("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(secret)) => Some(RazorpayConfig {
                key_id,
                key_secret: SecretString::from(secret),
                webhook_secret: get("RAZORPAY_WEBHOOK_SECRET").map(SecretString::from),
                api_base: get("RAZORPAY_API_BASE").unwrap_or_else(|| "https://api.razorpay.com".to_string()),
            }),
            _ => None,
        };

        let smtp = SmtpConfig {
            host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parse_or(&get, "SMTP_PORT", 587)?,
            username: get("EMAIL_USER"),
            password: get("EMAIL_PASS").map(SecretString::from),
            from_name: get("EMAIL_FROM_NAME").unwrap_or_else(|| "Comix".to_string()),
        };

        let cloudinary = match (get("CLOUDINARY_CLOUD_NAME"), get("CLOUDINARY_API_KEY"), get("CLOUDINARY_API_SECRET")) {
            (Some(cloud_name), Some(api_key), Some(secret)) => {
                Some(CloudinaryConfig { cloud_name, api_key, api_secret: SecretString::from(secret) })
            }
            _ => None,
        };

        let admin_seed = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email: email.trim().to_lowercase(), password: SecretString::from(password) }),
            _ => None,
        };

        let port = parse_or(&get, "PORT", 8083u16)?;

        Ok(Config {
            database_url,
            environment,
            port,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            log_level: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            jwt_secret: SecretString::from(jwt_secret),
            jwt_access_token_ttl_seconds: parse_or(&get, "JWT_ACCESS_TOKEN_TTL_SECONDS", 900)?,
            jwt_refresh_token_ttl_days: parse_or(&get, "JWT_REFRESH_TOKEN_TTL_DAYS", 7)?,
            razorpay,
            smtp,
            cloudinary,
            google_client_id: get("GOOGLE_CLIENT_ID"),
            nats_url: get("NATS_URL"),
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
            shipping_fee: parse_or(&get, "SHIPPING_FEE", Decimal::new(10350, 2))?,
            pending_order_ttl_minutes: parse_or(&get, "PENDING_ORDER_TTL_MINUTES", 30)?,
            cleanup_interval_secs: parse_or(&get, "CLEANUP_INTERVAL_SECS", 300)?,
            admin_seed,
        })
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                // `postgres://host` has its scheme colon before `//`
                if !self.database_url[colon_pos..at_pos].starts_with("://") {
                    let prefix = &self.database_url[..colon_pos + 1];
                    let suffix = &self.database_url[at_pos..];
                    return format!("{}****{}", prefix, suffix);
                }
            }
        }
        self.database_url.clone()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/comix")]).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.shipping_fee, Decimal::new(10350, 2));
        assert_eq!(config.pending_order_ttl_minutes, 30);
        assert_eq!(config.cleanup_interval_secs, 300);
        assert_eq!(config.jwt_access_token_ttl_seconds, 900);
        assert_eq!(config.smtp.host, "smtp.gmail.com");
        assert_eq!(config.public_base_url, "http://localhost:8083");
        assert!(config.razorpay.is_none());
        assert!(config.admin_seed.is_none());
        assert_eq!(config.jwt_secret.expose_secret(), DEV_JWT_SECRET);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(matches!(config_from(&[]), Err(ConfigError::MissingEnvVar(ref k)) if k == "DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for PORT: 'eighty'");
        assert!(config_from(&[("DATABASE_URL", "postgres://x"), ("SHIPPING_FEE", "free")]).is_err());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("ENVIRONMENT", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "JWT_SECRET"));
    }

    #[test]
    fn test_integrations() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("RAZORPAY_KEY_ID", "rzp_test_1"),
            ("RAZORPAY_KEY_SECRET", "s3cret"),
            ("ADMIN_EMAIL", " Admin@Comix.in "),
            ("ADMIN_PASSWORD", "changeme"),
            ("PUBLIC_BASE_URL", "https://api.comix.in/"),
        ])
        .unwrap();
        let razorpay = config.razorpay.unwrap();
        assert_eq!(razorpay.key_id, "rzp_test_1");
        assert!(razorpay.webhook_secret.is_none());
        assert_eq!(config.admin_seed.unwrap().email, "admin@comix.in");
        assert_eq!(config.public_base_url, "https://api.comix.in");
    }

    #[test]
    fn test_database_url_masked() {
        let config = config_from(&[("DATABASE_URL", "postgres://comix:hunter2@db:5432/comix")]).unwrap();
        assert_eq!(config.database_url_masked(), "postgres://comix:****@db:5432/comix");
        let bare = config_from(&[("DATABASE_URL", "postgres://db/comix")]).unwrap();
        assert_eq!(bare.database_url_masked(), "postgres://db/comix");
    }
}
