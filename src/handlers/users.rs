//! Profile endpoints and admin user management

use axum::extract::{Multipart, Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, FormParts, JsonBody};
use crate::db::{self, users::ProfileUpdate, Page, PageParams};
use crate::domain::aggregates::{Address, User};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockBody { pub is_blocked: Option<bool> }

/// GET /api/users/me
pub async fn me(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<User>> {
    let profile = db::users::find_by_id(&s.db, user.user_id).await?.ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::ok(profile))
}

/// PUT /api/users/me (multipart). Username and email are not editable here.
pub async fn update_me(State(s): State<AppState>, user: AuthenticatedUser, multipart: Multipart) -> ApiResult<ApiResponse<User>> {
    let mut form = FormParts::read(multipart).await?;
    let address = form.json::<Address>("address")?;
    if let Some(address) = &address {
        address.validate()?;
    }
    let profile_picture = match form.take_images("profile_picture").into_iter().next() {
        Some(upload) => Some(s.media.upload(upload, "profiles").await?.secure_url),
        None => None,
    };
    let update = ProfileUpdate {
        first_name: form.text("first_name"),
        last_name: form.text("last_name"),
        phone_number: form.text("phone_number"),
        addresses: address.map(|a| vec![a]),
        profile_picture,
    };
    let profile = db::users::update_profile(&s.db, user.user_id, &update).await?.ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::with_message("Profile updated successfully", profile))
}

/// POST /api/users/me/addresses
pub async fn add_address(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(address): JsonBody<Address>) -> ApiResult<ApiResponse<User>> {
    address.validate()?;
    let profile = db::users::push_address(&s.db, user.user_id, &address).await?.ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::with_message("Address added successfully", profile))
}

/// GET /api/admin/users
pub async fn list(State(s): State<AppState>, _admin: AdminUser, Query(page): Query<PageParams>) -> ApiResult<ApiResponse<Page<User>>> {
    let (users, total) = db::users::list(&s.db, &page).await?;
    Ok(ApiResponse::ok(Page::new(users, total, &page)))
}

/// GET /api/admin/users/:id
pub async fn get(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<User>> {
    let user = db::users::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ApiResponse::ok(user))
}

/// PATCH /api/admin/users/:id/block. Without a flag the current state is flipped.
pub async fn block(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, body: Option<JsonBody<BlockBody>>) -> ApiResult<ApiResponse<User>> {
    let flag = body.and_then(|JsonBody(b)| b.is_blocked);
    let user = db::users::set_blocked(&s.db, id, flag).await?.ok_or_else(|| ApiError::not_found("User"))?;
    if user.is_blocked {
        let revoked = s.auth.revoke_user_sessions(user.id).await?;
        tracing::info!(user_id = %user.id, revoked, "User blocked");
    }
    let message = if user.is_blocked { "User blocked successfully" } else { "User unblocked successfully" };
    Ok(ApiResponse::with_message(message, user))
}
