//! Customer reports against products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::string_enum;

string_enum! {
    pub enum ReportStatus {
        Pending => "Pending",
        Reviewed => "Reviewed",
        Resolved => "Resolved",
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsletterSubscription {
    pub id: Uuid,
    pub email: String,
    pub is_subscribed: bool,
    pub subscribed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!("Reviewed".parse::<ReportStatus>().unwrap(), ReportStatus::Reviewed);
        assert!("reviewed".parse::<ReportStatus>().is_err());
        assert_eq!(ReportStatus::ALL.len(), 3);
    }
}
