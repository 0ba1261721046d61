use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, JsonBody};
use crate::db::{self, Page, PageParams};
use crate::domain::aggregates::{Report, ReportStatus};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportBody {
    pub product_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody { pub status: ReportStatus }

/// POST /api/reports
pub async fn create(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<ReportBody>) -> ApiResult<(StatusCode, ApiResponse<Report>)> {
    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::BadRequest("Reason is required".to_string()));
    }
    db::products::find_by_id(&s.db, body.product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    let report = db::reports::create(&s.db, user.user_id, body.product_id, reason).await?;
    tracing::info!(report_id = %report.id, product_id = %report.product_id, "Product reported");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Report submitted successfully", report)))
}

/// GET /api/admin/reports
pub async fn list(State(s): State<AppState>, _admin: AdminUser, Query(page): Query<PageParams>) -> ApiResult<ApiResponse<Page<Report>>> {
    let (reports, total) = db::reports::list(&s.db, &page).await?;
    Ok(ApiResponse::ok(Page::new(reports, total, &page)))
}

/// PATCH /api/admin/reports/:id/status
pub async fn set_status(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, JsonBody(body): JsonBody<StatusBody>) -> ApiResult<ApiResponse<Report>> {
    let report = db::reports::set_status(&s.db, id, body.status).await?.ok_or_else(|| ApiError::not_found("Report"))?;
    Ok(ApiResponse::with_message("Report status updated", report))
}
