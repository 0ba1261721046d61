use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::NewsletterSubscription;

pub async fn find_by_email<'e>(db: impl PgExecutor<'e>, email: &str) -> Result<Option<NewsletterSubscription>, sqlx::Error> {
    sqlx::query_as::<_, NewsletterSubscription>("SELECT * FROM newsletter_subscriptions WHERE email = $1")
        .bind(email).fetch_optional(db).await
}

/// Inserts a subscription or re-activates an unsubscribed one.
pub async fn subscribe<'e>(db: impl PgExecutor<'e>, email: &str) -> Result<NewsletterSubscription, sqlx::Error> {
    sqlx::query_as::<_, NewsletterSubscription>(
        "INSERT INTO newsletter_subscriptions (id, email, is_subscribed, subscribed_at, created_at, updated_at) \
         VALUES ($1, $2, TRUE, NOW(), NOW(), NOW()) \
         ON CONFLICT (email) DO UPDATE SET is_subscribed = TRUE, subscribed_at = NOW(), updated_at = NOW() RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(email)
    .fetch_one(db).await
}

pub async fn unsubscribe<'e>(db: impl PgExecutor<'e>, email: &str) -> Result<Option<NewsletterSubscription>, sqlx::Error> {
    sqlx::query_as::<_, NewsletterSubscription>(
        "UPDATE newsletter_subscriptions SET is_subscribed = FALSE, updated_at = NOW() WHERE email = $1 RETURNING *",
    )
    .bind(email)
    .fetch_optional(db).await
}
