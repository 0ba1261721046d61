use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::{Banner, BannerType};

#[derive(Debug, Clone)]
pub struct NewBanner {
    pub image_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub banner_type: BannerType,
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct BannerUpdate {
    pub image_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub product_id: Option<Uuid>,
}

pub async fn list<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Banner>, sqlx::Error> {
    sqlx::query_as::<_, Banner>("SELECT * FROM banners ORDER BY created_at DESC").fetch_all(db).await
}

pub async fn list_by_type<'e>(db: impl PgExecutor<'e>, banner_type: BannerType) -> Result<Vec<Banner>, sqlx::Error> {
    sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE banner_type = $1 ORDER BY created_at DESC")
        .bind(banner_type).fetch_all(db).await
}

pub async fn count_by_type<'e>(db: impl PgExecutor<'e>, banner_type: BannerType) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM banners WHERE banner_type = $1").bind(banner_type).fetch_one(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Banner>, sqlx::Error> {
    sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn create<'e>(db: impl PgExecutor<'e>, b: &NewBanner) -> Result<Banner, sqlx::Error> {
    sqlx::query_as::<_, Banner>(
        "INSERT INTO banners (id, image_url, title, description, link, banner_type, product_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&b.image_url).bind(&b.title).bind(&b.description).bind(&b.link)
    .bind(b.banner_type).bind(b.product_id)
    .fetch_one(db).await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, u: &BannerUpdate) -> Result<Option<Banner>, sqlx::Error> {
    sqlx::query_as::<_, Banner>(
        "UPDATE banners SET image_url = COALESCE($2, image_url), title = COALESCE($3, title), \
         description = COALESCE($4, description), link = COALESCE($5, link), product_id = COALESCE($6, product_id), \
         updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(&u.image_url).bind(&u.title).bind(&u.description).bind(&u.link).bind(u.product_id)
    .fetch_optional(db).await
}

pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Banner>, sqlx::Error> {
    sqlx::query_as::<_, Banner>("DELETE FROM banners WHERE id = $1 RETURNING *").bind(id).fetch_optional(db).await
}
