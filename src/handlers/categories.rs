use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{ApiResponse, JsonBody};
use crate::db;
use crate::domain::aggregates::{category::normalize_name, Category, Subcategory, SubcategoryPatch};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryBody { pub name: String, pub description: Option<String> }

#[derive(Debug, Deserialize)]
pub struct CategoryPatch { pub name: Option<String>, pub description: Option<String>, pub is_blocked: Option<bool> }

#[derive(Debug, Deserialize)]
pub struct SubcategoryBody { pub name: String, pub description: Option<String> }

async fn load(s: &AppState, id: Uuid) -> ApiResult<Category> {
    db::categories::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Category"))
}

pub async fn list(State(s): State<AppState>) -> ApiResult<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(db::categories::list(&s.db).await?))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Category>> {
    Ok(ApiResponse::ok(load(&s, id).await?))
}

pub async fn create(State(s): State<AppState>, _admin: AdminUser, JsonBody(body): JsonBody<CategoryBody>) -> ApiResult<(StatusCode, ApiResponse<Category>)> {
    let name = normalize_name(&body.name)?;
    let category = db::categories::create(&s.db, &name, body.description.as_deref()).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Category created successfully", category)))
}

pub async fn update(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, JsonBody(body): JsonBody<CategoryPatch>) -> ApiResult<ApiResponse<Category>> {
    let name = body.name.as_deref().map(normalize_name).transpose()?;
    let category = db::categories::update(&s.db, id, name.as_deref(), body.description.as_deref(), body.is_blocked)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    Ok(ApiResponse::with_message("Category updated successfully", category))
}

pub async fn delete(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Value>> {
    if !db::categories::delete(&s.db, id).await? {
        return Err(ApiError::not_found("Category"));
    }
    Ok(ApiResponse::with_message("Category deleted successfully", Value::Null))
}

pub async fn add_subcategory(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<SubcategoryBody>,
) -> ApiResult<(StatusCode, ApiResponse<Subcategory>)> {
    let mut category = load(&s, id).await?;
    let sub = category.add_subcategory(&body.name, body.description)?.clone();
    db::categories::save_subcategories(&s.db, &category).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Subcategory added successfully", sub)))
}

pub async fn update_subcategory(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path((id, sub_id)): Path<(Uuid, Uuid)>,
    JsonBody(patch): JsonBody<SubcategoryPatch>,
) -> ApiResult<ApiResponse<Subcategory>> {
    let mut category = load(&s, id).await?;
    let sub = category.update_subcategory(sub_id, patch)?.clone();
    db::categories::save_subcategories(&s.db, &category).await?;
    Ok(ApiResponse::with_message("Subcategory updated successfully", sub))
}

pub async fn delete_subcategory(State(s): State<AppState>, _admin: AdminUser, Path((id, sub_id)): Path<(Uuid, Uuid)>) -> ApiResult<ApiResponse<Value>> {
    let mut category = load(&s, id).await?;
    category.remove_subcategory(sub_id)?;
    db::categories::save_subcategories(&s.db, &category).await?;
    Ok(ApiResponse::with_message("Subcategory deleted successfully", Value::Null))
}
