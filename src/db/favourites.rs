use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::Product;

/// Fails with a unique violation when the product is already a favourite.
pub async fn add<'e>(db: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO favourites (id, user_id, product_id, created_at) VALUES ($1, $2, $3, NOW())")
        .bind(Uuid::now_v7()).bind(user_id).bind(product_id)
        .execute(db).await?;
    Ok(())
}

pub async fn remove<'e>(db: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favourites WHERE user_id = $1 AND product_id = $2")
        .bind(user_id).bind(product_id)
        .execute(db).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn exists<'e>(db: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM favourites WHERE user_id = $1 AND product_id = $2)")
        .bind(user_id).bind(product_id)
        .fetch_one(db).await
}

pub async fn products_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT p.* FROM favourites f JOIN products p ON p.id = f.product_id WHERE f.user_id = $1 ORDER BY f.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db).await
}
