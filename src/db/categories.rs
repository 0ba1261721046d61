use sqlx::{types::Json, PgExecutor};
use uuid::Uuid;

use crate::domain::aggregates::Category;

pub async fn list<'e>(db: impl PgExecutor<'e>) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name").fetch_all(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn create<'e>(db: impl PgExecutor<'e>, name: &str, description: Option<&str>) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, description, is_blocked, subcategories, created_at, updated_at) \
         VALUES ($1, $2, $3, FALSE, '[]'::jsonb, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(name).bind(description)
    .fetch_one(db).await
}

pub async fn update<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
    is_blocked: Option<bool>,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = COALESCE($2, name), description = COALESCE($3, description), \
         is_blocked = COALESCE($4, is_blocked), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(name).bind(description).bind(is_blocked)
    .fetch_optional(db).await
}

/// Persists the subcategory list after the aggregate has changed it.
pub async fn save_subcategories<'e>(db: impl PgExecutor<'e>, category: &Category) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE categories SET subcategories = $2, updated_at = $3 WHERE id = $1")
        .bind(category.id).bind(Json(&category.subcategories.0)).bind(category.updated_at)
        .execute(db).await?;
    Ok(())
}

pub async fn delete<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
