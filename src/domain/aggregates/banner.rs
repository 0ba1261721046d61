//! Storefront banners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::string_enum;

string_enum! {
    pub enum BannerType {
        Homepage => "homepage",
        ProductPage => "productpage",
    }
}

impl BannerType {
    /// How many banners of this type may exist at once.
    pub fn quota(self) -> i64 {
        match self {
            BannerType::Homepage => 3,
            BannerType::ProductPage => 1,
        }
    }

    pub fn check_quota(self, existing: i64) -> Result<(), BannerError> {
        if existing >= self.quota() { return Err(BannerError::QuotaReached(self)); }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Banner {
    pub id: Uuid,
    pub image_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub banner_type: BannerType,
    pub product_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerError { QuotaReached(BannerType), MissingImage }
impl std::error::Error for BannerError {}
impl std::fmt::Display for BannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaReached(BannerType::Homepage) => write!(f, "Maximum number of homepage banners (3) reached"),
            Self::QuotaReached(BannerType::ProductPage) => write!(f, "Maximum number of product page banners (1) reached"),
            Self::MissingImage => write!(f, "No image uploaded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota() {
        assert!(BannerType::Homepage.check_quota(2).is_ok());
        assert_eq!(BannerType::Homepage.check_quota(3), Err(BannerError::QuotaReached(BannerType::Homepage)));
        assert!(BannerType::ProductPage.check_quota(0).is_ok());
        assert!(BannerType::ProductPage.check_quota(1).is_err());
        assert_eq!("productpage".parse::<BannerType>().unwrap(), BannerType::ProductPage);
    }
}
