use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Report, ReportStatus};

use super::PageParams;

pub async fn create<'e>(db: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid, reason: &str) -> Result<Report, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "INSERT INTO reports (id, user_id, product_id, reason, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'Pending', NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(user_id).bind(product_id).bind(reason)
    .fetch_one(db).await
}

pub async fn list(db: &PgPool, page: &PageParams) -> Result<(Vec<Report>, i64), sqlx::Error> {
    let reports = sqlx::query_as::<_, Report>("SELECT * FROM reports ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(db).await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports").fetch_one(db).await?;
    Ok((reports, total))
}

pub async fn set_status<'e>(db: impl PgExecutor<'e>, id: Uuid, status: ReportStatus) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>("UPDATE reports SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(status)
        .fetch_optional(db).await
}
