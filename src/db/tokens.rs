//! Refresh-token ledger: a refresh token is honoured only while its jti row is live.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

pub async fn insert<'e>(db: impl PgExecutor<'e>, jti: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO refresh_tokens (jti, user_id, expires_at, revoked, created_at) VALUES ($1, $2, $3, FALSE, NOW())")
        .bind(jti).bind(user_id).bind(expires_at)
        .execute(db).await?;
    Ok(())
}

/// Revokes a live token. Returns false when it was unknown, expired or already revoked,
/// so two concurrent refreshes cannot both rotate the same token.
pub async fn revoke<'e>(db: impl PgExecutor<'e>, jti: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1 AND NOT revoked AND expires_at > NOW()")
        .bind(jti)
        .execute(db).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn revoke_all_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
        .bind(user_id)
        .execute(db).await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired<'e>(db: impl PgExecutor<'e>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()").execute(db).await?;
    Ok(result.rows_affected())
}
