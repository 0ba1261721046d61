//! Offer Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::round_money;

/// Time-bounded percentage discount, storewide when `product_id` is empty.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub product_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedOffer {
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), OfferError> {
    if end <= start { return Err(OfferError::InvalidWindow); }
    Ok(())
}

pub fn validate_percentage(pct: Decimal) -> Result<(), OfferError> {
    if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED { return Err(OfferError::InvalidPercentage); }
    Ok(())
}

impl Offer {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    pub fn discount_for(&self, amount: Decimal) -> Decimal {
        round_money(amount * self.discount_percentage / Decimal::ONE_HUNDRED)
    }

    /// Applies the offer to `amount`, checking the window and product binding.
    pub fn apply(&self, amount: Decimal, product_id: Option<Uuid>, now: DateTime<Utc>) -> Result<AppliedOffer, OfferError> {
        if amount < Decimal::ZERO { return Err(OfferError::InvalidAmount); }
        if !self.is_active { return Err(OfferError::Inactive); }
        if !self.is_live_at(now) { return Err(OfferError::OutsideWindow); }
        if let Some(bound) = self.product_id {
            if product_id != Some(bound) { return Err(OfferError::ProductMismatch); }
        }
        let discount_amount = self.discount_for(amount);
        Ok(AppliedOffer { original_amount: amount, discount_amount, final_amount: round_money(amount - discount_amount) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferError { InvalidWindow, InvalidPercentage, InvalidAmount, Inactive, OutsideWindow, ProductMismatch }
impl std::error::Error for OfferError {}
impl std::fmt::Display for OfferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWindow => write!(f, "End date must be after start date"),
            Self::InvalidPercentage => write!(f, "Discount percentage must be greater than 0 and at most 100"),
            Self::InvalidAmount => write!(f, "Amount must not be negative"),
            Self::Inactive => write!(f, "Offer is not active"),
            Self::OutsideWindow => write!(f, "Offer is not valid at this time"),
            Self::ProductMismatch => write!(f, "Offer does not apply to this product"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn offer(pct: i64, product_id: Option<Uuid>) -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(), title: "Diwali".into(), description: None, discount_percentage: Decimal::new(pct, 0),
            start_date: now - Duration::days(1), end_date: now + Duration::days(1), product_id, image_url: None,
            is_active: true, created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_apply_rounds_discount() {
        let applied = offer(15, None).apply(Decimal::new(99999, 2), None, Utc::now()).unwrap();
        assert_eq!(applied.discount_amount, Decimal::new(15000, 2));
        assert_eq!(applied.final_amount, Decimal::new(84999, 2));
    }

    #[test]
    fn test_window_and_binding() {
        let now = Utc::now();
        let o = offer(10, Some(Uuid::new_v4()));
        assert_eq!(o.apply(Decimal::ONE_HUNDRED, None, now), Err(OfferError::ProductMismatch));
        assert_eq!(o.apply(Decimal::ONE_HUNDRED, o.product_id, now + Duration::days(2)), Err(OfferError::OutsideWindow));
        let mut inactive = offer(10, None);
        inactive.is_active = false;
        assert_eq!(inactive.apply(Decimal::ONE_HUNDRED, None, now), Err(OfferError::Inactive));
        assert!(o.is_live_at(o.start_date));
        assert!(o.is_live_at(o.end_date));
    }

    #[test]
    fn test_validation() {
        let now = Utc::now();
        assert_eq!(validate_window(now, now), Err(OfferError::InvalidWindow));
        assert!(validate_window(now, now + Duration::seconds(1)).is_ok());
        assert_eq!(validate_percentage(Decimal::ZERO), Err(OfferError::InvalidPercentage));
        assert!(validate_percentage(Decimal::ONE_HUNDRED).is_ok());
    }
}
