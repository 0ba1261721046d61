use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::Offer;

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub product_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

pub async fn list<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Offer>, sqlx::Error> {
    sqlx::query_as::<_, Offer>("SELECT * FROM offers ORDER BY created_at DESC").fetch_all(db).await
}

pub async fn list_live<'e>(db: impl PgExecutor<'e>, now: DateTime<Utc>) -> Result<Vec<Offer>, sqlx::Error> {
    sqlx::query_as::<_, Offer>(
        "SELECT * FROM offers WHERE is_active AND start_date <= $1 AND end_date >= $1 ORDER BY end_date",
    )
    .bind(now)
    .fetch_all(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn create<'e>(db: impl PgExecutor<'e>, o: &NewOffer) -> Result<Offer, sqlx::Error> {
    sqlx::query_as::<_, Offer>(
        "INSERT INTO offers (id, title, description, discount_percentage, start_date, end_date, product_id, image_url, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&o.title).bind(&o.description).bind(o.discount_percentage).bind(o.start_date)
    .bind(o.end_date).bind(o.product_id).bind(&o.image_url).bind(o.is_active)
    .fetch_one(db).await
}

/// Writes back an offer the handler has already merged and validated.
pub async fn save<'e>(db: impl PgExecutor<'e>, o: &Offer) -> Result<Offer, sqlx::Error> {
    sqlx::query_as::<_, Offer>(
        "UPDATE offers SET title = $2, description = $3, discount_percentage = $4, start_date = $5, end_date = $6, \
         product_id = $7, image_url = $8, is_active = $9, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(o.id).bind(&o.title).bind(&o.description).bind(o.discount_percentage).bind(o.start_date)
    .bind(o.end_date).bind(o.product_id).bind(&o.image_url).bind(o.is_active)
    .fetch_one(db).await
}

pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM offers WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
