//! Product reviews and rating aggregation

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub photo_url: Option<String>,
    pub comment: String,
    pub rating: i16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn is_written_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }
}

pub fn validate_rating(rating: i16) -> Result<(), ReviewError> {
    if !(1..=5).contains(&rating) { return Err(ReviewError::InvalidRating(rating)); }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), ReviewError> {
    if comment.trim().is_empty() { return Err(ReviewError::EmptyComment); }
    Ok(())
}

/// Mean of the ratings to one decimal, and how many there were.
pub fn rating_summary(ratings: &[i16]) -> (Decimal, i32) {
    if ratings.is_empty() { return (Decimal::ZERO, 0); }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as i64);
    (mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero), ratings.len() as i32)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError { InvalidRating(i16), EmptyComment }
impl std::error::Error for ReviewError {}
impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRating(r) => write!(f, "Rating must be between 1 and 5, got {}", r),
            Self::EmptyComment => write!(f, "Comment is required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary() {
        assert_eq!(rating_summary(&[]), (Decimal::ZERO, 0));
        assert_eq!(rating_summary(&[5, 4, 4]), (Decimal::new(43, 1), 3));
        assert_eq!(rating_summary(&[1, 2]), (Decimal::new(15, 1), 2));
    }

    #[test]
    fn test_validation() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert_eq!(validate_rating(6), Err(ReviewError::InvalidRating(6)));
        assert_eq!(validate_rating(0), Err(ReviewError::InvalidRating(0)));
        assert_eq!(validate_comment(" "), Err(ReviewError::EmptyComment));
    }
}
