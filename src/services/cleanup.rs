//! Periodic housekeeping: abandoned Razorpay orders and expired refresh tokens.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::db;

#[derive(Debug, Clone, Copy)]
pub struct CleanupSettings {
    pub interval: Duration,
    pub pending_order_ttl: chrono::Duration,
}

/// One sweep. Returns (orders deleted, tokens purged).
pub async fn sweep(db: &PgPool, pending_order_ttl: chrono::Duration) -> Result<(u64, u64), sqlx::Error> {
    let orders = db::orders::delete_stale_pending(db, Utc::now() - pending_order_ttl).await?;
    let tokens = db::tokens::purge_expired(db).await?;
    Ok((orders, tokens))
}

pub async fn stale_order_cleanup(db: PgPool, settings: CleanupSettings) {
    tracing::info!(interval_secs = settings.interval.as_secs(), "Starting stale order cleanup");

    loop {
        tokio::time::sleep(settings.interval).await;

        match sweep(&db, settings.pending_order_ttl).await {
            Ok((0, 0)) => {}
            Ok((orders, tokens)) => tracing::info!(orders, tokens, "Removed stale pending orders and expired tokens"),
            Err(e) => tracing::error!(error = %e, "Stale order cleanup failed"),
        }
    }
}
