use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use super::{validated, ApiResponse, JsonBody};
use crate::db::{self, offers::NewOffer};
use crate::domain::aggregates::{
    offer::{validate_percentage, validate_window},
    AppliedOffer, Offer,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfferBody {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub product_id: Option<Uuid>,
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool { true }

#[derive(Debug, Deserialize, Default)]
pub struct UpdateOfferBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub product_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateOfferBody {
    /// Applies the present fields to `offer`, keeping the window and percentage valid.
    fn apply_to(self, offer: &mut Offer) -> ApiResult<()> {
        if let Some(title) = self.title.map(|t| t.trim().to_string()) {
            if title.is_empty() {
                return Err(ApiError::BadRequest("Title is required".to_string()));
            }
            offer.title = title;
        }
        if let Some(description) = self.description { offer.description = Some(description); }
        if let Some(pct) = self.discount_percentage {
            validate_percentage(pct)?;
            offer.discount_percentage = pct;
        }
        if let Some(start) = self.start_date { offer.start_date = start; }
        if let Some(end) = self.end_date { offer.end_date = end; }
        validate_window(offer.start_date, offer.end_date)?;
        if let Some(product_id) = self.product_id { offer.product_id = Some(product_id); }
        if let Some(image_url) = self.image_url { offer.image_url = Some(image_url); }
        if let Some(is_active) = self.is_active { offer.is_active = is_active; }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplyOfferBody {
    pub offer_id: Uuid,
    pub amount: Decimal,
    pub product_id: Option<Uuid>,
}

async fn load(s: &AppState, id: Uuid) -> ApiResult<Offer> {
    db::offers::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Offer"))
}

/// GET /api/offers
pub async fn list(State(s): State<AppState>) -> ApiResult<ApiResponse<Vec<Offer>>> {
    Ok(ApiResponse::ok(db::offers::list(&s.db).await?))
}

/// GET /api/offers/active
pub async fn active(State(s): State<AppState>) -> ApiResult<ApiResponse<Vec<Offer>>> {
    Ok(ApiResponse::ok(db::offers::list_live(&s.db, Utc::now()).await?))
}

/// POST /api/offers
pub async fn create(State(s): State<AppState>, _admin: AdminUser, JsonBody(body): JsonBody<CreateOfferBody>) -> ApiResult<(StatusCode, ApiResponse<Offer>)> {
    let body = validated(body)?;
    validate_percentage(body.discount_percentage)?;
    validate_window(body.start_date, body.end_date)?;
    if let Some(product_id) = body.product_id {
        db::products::find_by_id(&s.db, product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    }
    let offer = db::offers::create(
        &s.db,
        &NewOffer {
            title: body.title.trim().to_string(),
            description: body.description,
            discount_percentage: body.discount_percentage,
            start_date: body.start_date,
            end_date: body.end_date,
            product_id: body.product_id,
            image_url: body.image_url,
            is_active: body.is_active,
        },
    )
    .await?;
    tracing::info!(offer_id = %offer.id, pct = %offer.discount_percentage, "Offer created");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Offer created successfully", offer)))
}

/// PUT /api/offers/:id
pub async fn update(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, JsonBody(body): JsonBody<UpdateOfferBody>) -> ApiResult<ApiResponse<Offer>> {
    let mut offer = load(&s, id).await?;
    body.apply_to(&mut offer)?;
    let offer = db::offers::save(&s.db, &offer).await?;
    Ok(ApiResponse::with_message("Offer updated successfully", offer))
}

/// DELETE /api/offers/:id
pub async fn delete(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Value>> {
    if !db::offers::delete(&s.db, id).await? {
        return Err(ApiError::not_found("Offer"));
    }
    Ok(ApiResponse::with_message("Offer deleted successfully", Value::Null))
}

/// POST /api/offers/apply
pub async fn apply(State(s): State<AppState>, JsonBody(body): JsonBody<ApplyOfferBody>) -> ApiResult<ApiResponse<AppliedOffer>> {
    let offer = load(&s, body.offer_id).await?;
    let applied = offer.apply(body.amount, body.product_id, Utc::now())?;
    Ok(ApiResponse::ok(applied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer() -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(), title: "Monsoon".into(), description: None, discount_percentage: Decimal::TEN,
            start_date: now, end_date: now + Duration::days(3), product_id: None, image_url: None,
            is_active: true, created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_partial_update_keeps_window_valid() {
        let mut o = offer();
        let before = o.start_date - Duration::days(1);
        let body = UpdateOfferBody { end_date: Some(before), ..Default::default() };
        assert!(body.apply_to(&mut o).is_err());

        let mut o = offer();
        let body = UpdateOfferBody { discount_percentage: Some(Decimal::new(25, 0)), is_active: Some(false), ..Default::default() };
        body.apply_to(&mut o).unwrap();
        assert_eq!(o.discount_percentage, Decimal::new(25, 0));
        assert!(!o.is_active);
    }

    #[test]
    fn test_update_rejects_bad_percentage() {
        let mut o = offer();
        let body = UpdateOfferBody { discount_percentage: Some(Decimal::new(101, 0)), ..Default::default() };
        assert!(body.apply_to(&mut o).is_err());
    }
}
