//! Product reviews. Every change recomputes the product's rating and review count.

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, FormParts, JsonBody};
use crate::db::{self, reviews::NewReview};
use crate::domain::aggregates::review::{rating_summary, validate_comment, validate_rating};
use crate::domain::aggregates::Review;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::services::ImageUpload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub product_id: Uuid,
    pub comment: String,
    pub rating: i16,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateReviewBody {
    pub comment: Option<String>,
    pub rating: Option<i16>,
    pub photo_url: Option<String>,
}

/// Writes the mean of the product's active ratings back to the product row.
async fn refresh_rating(s: &AppState, product_id: Uuid) -> ApiResult<()> {
    let ratings = db::reviews::active_ratings(&s.db, product_id).await?;
    let (rating, count) = rating_summary(&ratings);
    db::products::set_rating(&s.db, product_id, rating, count).await?;
    tracing::debug!(product_id = %product_id, rating = %rating, count, "Product rating recomputed");
    Ok(())
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// The review fields plus a photo file that has not been uploaded yet.
async fn read_review(s: &AppState, req: Request) -> ApiResult<(ReviewBody, Option<ImageUpload>)> {
    if !is_multipart(&req) {
        let JsonBody(body) = JsonBody::<ReviewBody>::from_request(req, s).await?;
        return Ok((body, None));
    }
    let multipart = Multipart::from_request(req, s).await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut form = FormParts::read(multipart).await?;
    let photo = form.take_images("photo").into_iter().next();
    let body = ReviewBody {
        product_id: form.parse::<Uuid>("product_id")?.ok_or_else(|| ApiError::BadRequest("product_id is required".to_string()))?,
        comment: form.required("comment")?,
        rating: form.parse::<i16>("rating")?.ok_or_else(|| ApiError::BadRequest("rating is required".to_string()))?,
        photo_url: form.text("photo_url"),
    };
    Ok((body, photo))
}

fn already_reviewed() -> ApiError { ApiError::Conflict("You have already reviewed this product".to_string()) }

/// GET /api/products/:id/reviews
pub async fn for_product(State(s): State<AppState>, Path(product_id): Path<Uuid>) -> ApiResult<ApiResponse<Vec<Review>>> {
    Ok(ApiResponse::ok(db::reviews::list_active_for_product(&s.db, product_id).await?))
}

/// POST /api/reviews (multipart with an optional `photo` file, or JSON)
pub async fn create(State(s): State<AppState>, user: AuthenticatedUser, req: Request) -> ApiResult<(StatusCode, ApiResponse<Review>)> {
    let (body, photo) = read_review(&s, req).await?;
    validate_rating(body.rating)?;
    validate_comment(&body.comment)?;
    db::products::find_by_id(&s.db, body.product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    if db::reviews::exists_for(&s.db, user.user_id, body.product_id).await? {
        return Err(already_reviewed());
    }

    // upload only once the review is known to be accepted
    let uploaded = match photo {
        Some(photo) => Some(s.media.upload(photo, "reviews").await?.secure_url),
        None => None,
    };
    let new_review = NewReview {
        user_id: user.user_id,
        product_id: body.product_id,
        photo_url: uploaded.clone().or(body.photo_url),
        comment: body.comment.trim().to_string(),
        rating: body.rating,
    };
    let review = match db::reviews::create(&s.db, &new_review).await {
        Ok(review) => review,
        Err(e) => {
            if let Some(url) = &uploaded {
                if let Err(destroy) = s.media.destroy_by_url(url).await {
                    tracing::warn!(url = %url, error = %destroy, "Failed to delete photo of rejected review");
                }
            }
            return Err(match ApiError::from(e) {
                ApiError::Conflict(_) => already_reviewed(),
                other => other,
            });
        }
    };
    refresh_rating(&s, review.product_id).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Review added successfully", review)))
}

/// PUT /api/reviews/:id
pub async fn update(State(s): State<AppState>, user: AuthenticatedUser, Path(id): Path<Uuid>, JsonBody(body): JsonBody<UpdateReviewBody>) -> ApiResult<ApiResponse<Review>> {
    let review = db::reviews::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Review"))?;
    if !review.is_written_by(user.user_id) {
        return Err(ApiError::Forbidden("You can only edit your own reviews".to_string()));
    }
    if let Some(rating) = body.rating {
        validate_rating(rating)?;
    }
    let comment = body.comment.as_deref().map(str::trim);
    if let Some(comment) = comment {
        validate_comment(comment)?;
    }
    let updated = db::reviews::update(&s.db, id, comment, body.rating, body.photo_url.as_deref()).await?;
    refresh_rating(&s, updated.product_id).await?;
    Ok(ApiResponse::with_message("Review updated successfully", updated))
}

/// PATCH /api/reviews/:id/block
pub async fn toggle_block(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Review>> {
    let review = db::reviews::toggle_active(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Review"))?;
    refresh_rating(&s, review.product_id).await?;
    let message = if review.is_active { "Review unblocked" } else { "Review blocked" };
    Ok(ApiResponse::with_message(message, review))
}
