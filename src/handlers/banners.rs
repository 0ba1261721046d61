use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde_json::Value;
use uuid::Uuid;

use super::{ApiResponse, FormParts};
use crate::db::{
    self,
    banners::{BannerUpdate, NewBanner},
};
use crate::domain::aggregates::{Banner, BannerError, BannerType};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::state::AppState;

const BANNER_FOLDER: &str = "banners";

/// GET /api/banners
pub async fn list(State(s): State<AppState>) -> ApiResult<ApiResponse<Vec<Banner>>> {
    Ok(ApiResponse::ok(db::banners::list(&s.db).await?))
}

/// GET /api/banners/type/:type
pub async fn by_type(State(s): State<AppState>, Path(banner_type): Path<String>) -> ApiResult<ApiResponse<Vec<Banner>>> {
    let banner_type = banner_type.parse::<BannerType>()?;
    Ok(ApiResponse::ok(db::banners::list_by_type(&s.db, banner_type).await?))
}

/// GET /api/banners/:id
pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Banner>> {
    let banner = db::banners::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Banner"))?;
    Ok(ApiResponse::ok(banner))
}

/// POST /api/banners (multipart, `image` file required)
pub async fn create(State(s): State<AppState>, _admin: AdminUser, multipart: Multipart) -> ApiResult<(StatusCode, ApiResponse<Banner>)> {
    let mut form = FormParts::read(multipart).await?;
    let banner_type = form.parse::<BannerType>("banner_type")?.unwrap_or(BannerType::Homepage);
    let image = form.take_images("image").into_iter().next().ok_or(BannerError::MissingImage)?;
    banner_type.check_quota(db::banners::count_by_type(&s.db, banner_type).await?)?;

    let uploaded = s.media.upload(image, BANNER_FOLDER).await?;
    let banner = db::banners::create(
        &s.db,
        &NewBanner {
            image_url: uploaded.secure_url,
            title: form.text("title"),
            description: form.text("description"),
            link: form.text("link"),
            banner_type,
            product_id: form.parse::<Uuid>("product_id")?,
        },
    )
    .await?;
    tracing::info!(banner_id = %banner.id, banner_type = %banner.banner_type, "Banner created");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Banner created successfully", banner)))
}

/// PUT /api/banners/:id (multipart, optional `image` replaces the current one)
pub async fn update(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, multipart: Multipart) -> ApiResult<ApiResponse<Banner>> {
    let mut form = FormParts::read(multipart).await?;
    let existing = db::banners::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Banner"))?;
    let image_url = match form.take_images("image").into_iter().next() {
        Some(image) => Some(s.media.upload(image, BANNER_FOLDER).await?.secure_url),
        None => None,
    };
    let update = BannerUpdate {
        image_url: image_url.clone(),
        title: form.text("title"),
        description: form.text("description"),
        link: form.text("link"),
        product_id: form.parse::<Uuid>("product_id")?,
    };
    let banner = db::banners::update(&s.db, id, &update).await?.ok_or_else(|| ApiError::not_found("Banner"))?;
    if image_url.is_some() {
        if let Err(e) = s.media.destroy_by_url(&existing.image_url).await {
            tracing::warn!(banner_id = %id, error = %e, "Failed to delete replaced banner image");
        }
    }
    Ok(ApiResponse::with_message("Banner updated successfully", banner))
}

/// DELETE /api/banners/:id
pub async fn delete(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Value>> {
    let banner = db::banners::delete(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Banner"))?;
    if let Err(e) = s.media.destroy_by_url(&banner.image_url).await {
        tracing::warn!(banner_id = %id, error = %e, "Failed to delete banner image");
    }
    Ok(ApiResponse::with_message("Banner deleted successfully", Value::Null))
}
