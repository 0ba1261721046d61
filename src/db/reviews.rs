use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::Review;

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub photo_url: Option<String>,
    pub comment: String,
    pub rating: i16,
}

pub async fn list_active_for_product<'e>(db: impl PgExecutor<'e>, product_id: Uuid) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE product_id = $1 AND is_active ORDER BY created_at DESC")
        .bind(product_id).fetch_all(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn exists_for<'e>(db: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = $1 AND product_id = $2)")
        .bind(user_id).bind(product_id)
        .fetch_one(db).await
}

/// Fails with a unique violation when the user already reviewed the product.
pub async fn create<'e>(db: impl PgExecutor<'e>, r: &NewReview) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, user_id, product_id, photo_url, comment, rating, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(r.user_id).bind(r.product_id).bind(&r.photo_url).bind(&r.comment).bind(r.rating)
    .fetch_one(db).await
}

pub async fn update<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
    comment: Option<&str>,
    rating: Option<i16>,
    photo_url: Option<&str>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        "UPDATE reviews SET comment = COALESCE($2, comment), rating = COALESCE($3, rating), \
         photo_url = COALESCE($4, photo_url), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(comment).bind(rating).bind(photo_url)
    .fetch_one(db).await
}

pub async fn toggle_active<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>("UPDATE reviews SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).fetch_optional(db).await
}

pub async fn active_ratings<'e>(db: impl PgExecutor<'e>, product_id: Uuid) -> Result<Vec<i16>, sqlx::Error> {
    sqlx::query_scalar::<_, i16>("SELECT rating FROM reviews WHERE product_id = $1 AND is_active")
        .bind(product_id).fetch_all(db).await
}
