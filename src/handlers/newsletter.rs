use askama::Template;
use axum::{
    extract::{Path, State},
    response::Html,
};
use serde::Deserialize;

use super::{ApiResponse, JsonBody};
use crate::db;
use crate::domain::aggregates::NewsletterSubscription;
use crate::domain::value_objects::EmailAddress;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailBody { pub email: String }

#[derive(Template)]
#[template(path = "newsletter_unsubscribed.html")]
struct UnsubscribedPage<'a> {
    email: &'a str,
}

fn unsubscribe_link(base_url: &str, email: &EmailAddress) -> String {
    format!("{}/api/newsletter/unsubscribe/{}", base_url.trim_end_matches('/'), email)
}

async fn unsubscribe_email(s: &AppState, raw: &str) -> ApiResult<NewsletterSubscription> {
    let email = EmailAddress::parse(raw)?;
    db::newsletter::unsubscribe(&s.db, email.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound("Email not found in subscription list".to_string()))
}

/// POST /api/newsletter/subscribe
pub async fn subscribe(State(s): State<AppState>, JsonBody(body): JsonBody<EmailBody>) -> ApiResult<ApiResponse<NewsletterSubscription>> {
    let email = EmailAddress::parse(&body.email)?;
    if db::newsletter::find_by_email(&s.db, email.as_str()).await?.is_some_and(|sub| sub.is_subscribed) {
        return Err(ApiError::BadRequest("Email is already subscribed".to_string()));
    }
    let subscription = db::newsletter::subscribe(&s.db, email.as_str()).await?;
    let link = unsubscribe_link(&s.config.public_base_url, &email);
    if let Err(e) = s.email.send_newsletter_welcome(email.as_str(), &link).await {
        tracing::error!(email = %email, error = %e, "Failed to send newsletter welcome email");
    }
    tracing::info!(email = %email, "Newsletter subscription");
    Ok(ApiResponse::with_message("Successfully subscribed to newsletter", subscription))
}

/// POST /api/newsletter/unsubscribe
pub async fn unsubscribe(State(s): State<AppState>, JsonBody(body): JsonBody<EmailBody>) -> ApiResult<ApiResponse<NewsletterSubscription>> {
    let subscription = unsubscribe_email(&s, &body.email).await?;
    Ok(ApiResponse::with_message("Successfully unsubscribed from newsletter", subscription))
}

/// GET /api/newsletter/unsubscribe/:email, the link from the welcome email.
pub async fn unsubscribe_page(State(s): State<AppState>, Path(email): Path<String>) -> ApiResult<Html<String>> {
    let subscription = unsubscribe_email(&s, &email).await?;
    let page = UnsubscribedPage { email: &subscription.email }
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Html(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_link() {
        let email = EmailAddress::parse("Reader@Example.com").unwrap();
        assert_eq!(
            unsubscribe_link("https://shop.example.com/", &email),
            "https://shop.example.com/api/newsletter/unsubscribe/reader@example.com"
        );
    }

    #[test]
    fn test_unsubscribed_page_escapes_email() {
        let html = UnsubscribedPage { email: "<b>x</b>@example.com" }.render().unwrap();
        assert!(!html.contains("<b>"));
        assert!(html.contains("&#60;b&#62;x&#60;/b&#62;@example.com"));
    }
}
