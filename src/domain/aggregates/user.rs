//! User accounts and their saved addresses

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::string_enum;

string_enum! {
    pub enum Role {
        Customer => "customer",
        Admin => "admin",
    }
}

pub const ADDRESS_LABELS: [&str; 4] = ["Home", "Work", "Office", "Other"];

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
    pub addresses: Json<Vec<Address>>,
    pub role: Role,
    pub is_blocked: bool,
    pub referral_code: Option<String>,
    pub referral_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{} {}", f, l),
            (Some(f), None) => f.clone(),
            _ => self.username.clone().unwrap_or_else(|| self.email.clone()),
        }
    }
}

/// Shipping address. `address_name` is the label the customer picked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address_name: Option<String>,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub house: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone_number: String,
}

impl Address {
    /// Checks every field is filled and the label is one of [`ADDRESS_LABELS`].
    pub fn validate(&self) -> Result<(), AddressError> {
        let label = self.address_name.as_deref().unwrap_or("");
        let fields = [
            ("address_name", label),
            ("street", self.street.as_str()),
            ("state", self.state.as_str()),
            ("house", self.house.as_str()),
            ("postcode", self.postcode.as_str()),
            ("location", self.location.as_str()),
            ("country", self.country.as_str()),
            ("phone_number", self.phone_number.as_str()),
        ];
        let missing: Vec<&'static str> = fields.iter().filter(|(_, v)| v.trim().is_empty()).map(|(k, _)| *k).collect();
        if !missing.is_empty() { return Err(AddressError::MissingFields(missing)); }
        if !ADDRESS_LABELS.contains(&label) { return Err(AddressError::InvalidLabel(label.to_string())); }
        Ok(())
    }

    /// Same as [`validate`](Self::validate) but without a label, as for checkout addresses.
    pub fn validate_for_shipping(&self) -> Result<(), AddressError> {
        let mut labelled = self.clone();
        labelled.address_name.get_or_insert_with(|| "Other".to_string());
        labelled.validate()
    }

    pub fn one_line(&self) -> String {
        format!("{}, {}, {}, {} {}, {}", self.house, self.street, self.location, self.state, self.postcode, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError { MissingFields(Vec<&'static str>), InvalidLabel(String) }
impl std::error::Error for AddressError {}
impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => write!(f, "Missing required fields: {}", fields.join(", ")),
            Self::InvalidLabel(_) => write!(f, "Invalid address_name. Must be one of: {}", ADDRESS_LABELS.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::sample_address;

    #[test]
    fn test_address_validation() {
        let mut addr = sample_address();
        assert!(addr.validate_for_shipping().is_ok());
        assert!(matches!(addr.validate(), Err(AddressError::MissingFields(ref f)) if f == &vec!["address_name"]));

        addr.address_name = Some("Cottage".into());
        assert_eq!(addr.validate().unwrap_err().to_string(), "Invalid address_name. Must be one of: Home, Work, Office, Other");

        addr.address_name = Some("Home".into());
        addr.street.clear();
        addr.postcode = "  ".into();
        assert_eq!(addr.validate().unwrap_err().to_string(), "Missing required fields: street, postcode");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
