use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{ApiResponse, JsonBody};
use crate::db;
use crate::domain::aggregates::Product;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FavouriteBody { pub product_id: Uuid }

#[derive(Debug, Serialize)]
pub struct FavouriteStatus { pub is_favourite: bool }

/// POST /api/favourites
pub async fn add(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<FavouriteBody>) -> ApiResult<(StatusCode, ApiResponse<Value>)> {
    db::products::find_by_id(&s.db, body.product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    db::favourites::add(&s.db, user.user_id, body.product_id).await.map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("Product already in favourites".to_string()),
        other => other,
    })?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Added to favourites", Value::Null)))
}

/// DELETE /api/favourites/:product_id
pub async fn remove(State(s): State<AppState>, user: AuthenticatedUser, Path(product_id): Path<Uuid>) -> ApiResult<ApiResponse<Value>> {
    if !db::favourites::remove(&s.db, user.user_id, product_id).await? {
        return Err(ApiError::NotFound("Product not in favourites".to_string()));
    }
    Ok(ApiResponse::with_message("Removed from favourites", Value::Null))
}

/// GET /api/favourites
pub async fn list(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok(db::favourites::products_for_user(&s.db, user.user_id).await?))
}

/// GET /api/favourites/:product_id
pub async fn check(State(s): State<AppState>, user: AuthenticatedUser, Path(product_id): Path<Uuid>) -> ApiResult<ApiResponse<FavouriteStatus>> {
    let is_favourite = db::favourites::exists(&s.db, user.user_id, product_id).await?;
    Ok(ApiResponse::ok(FavouriteStatus { is_favourite }))
}
