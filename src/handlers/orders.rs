//! Customer and admin order endpoints. State changes go through [`CheckoutService`](crate::services::CheckoutService).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, JsonBody};
use crate::db::{self, Page, PageParams};
use crate::domain::aggregates::{Address, Order, OrderStatus, PaymentMethod, ReturnReason, ReturnStatus, ReturnType};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::services::{
    invoice::{invoice_filename, render_invoice, BillTo},
    PlacedOrder,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub offer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnBody {
    pub request_type: ReturnType,
    pub reason: ReturnReason,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReturnBody { pub status: ReturnStatus }

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Loads an order the caller may see: their own, or any for admins.
async fn load_visible(s: &AppState, user: &AuthenticatedUser, id: Uuid) -> ApiResult<Order> {
    db::orders::find_by_id(&s.db, id)
        .await?
        .filter(|o| user.is_admin() || o.belongs_to(user.user_id))
        .ok_or_else(|| ApiError::not_found("Order"))
}

/// POST /api/orders/checkout
pub async fn checkout(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<CheckoutBody>) -> ApiResult<(StatusCode, ApiResponse<PlacedOrder>)> {
    let placed = s.checkout.checkout_cart(user.user_id, body.shipping_address, body.payment_method, body.offer_id).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Order placed successfully", placed)))
}

/// GET /api/orders
pub async fn list_mine(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<Vec<Order>>> {
    Ok(ApiResponse::ok(db::orders::list_for_user(&s.db, user.user_id).await?))
}

/// GET /api/orders/:id
pub async fn get(State(s): State<AppState>, user: AuthenticatedUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Order>> {
    Ok(ApiResponse::ok(load_visible(&s, &user, id).await?))
}

/// GET /api/orders/:id/invoice
pub async fn invoice(State(s): State<AppState>, user: AuthenticatedUser, Path(id): Path<Uuid>) -> ApiResult<Response> {
    let order = load_visible(&s, &user, id).await?;
    let bill_to = match order.guest_info.as_ref() {
        Some(guest) => BillTo { name: format!("{} {}", guest.first_name, guest.last_name).trim().to_string(), email: guest.email.clone() },
        None => {
            let owner = match order.user_id {
                Some(owner_id) => db::users::find_by_id(&s.db, owner_id).await?,
                None => None,
            };
            match owner {
                Some(u) => BillTo { name: u.display_name(), email: u.email },
                None => BillTo { name: "Customer".to_string(), email: String::new() },
            }
        }
    };
    let html = render_invoice(&order, &bill_to, &s.config.smtp.from_name)?;
    let disposition = format!("attachment; filename=\"{}\"", invoice_filename(&order));
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)],
        html,
    )
        .into_response())
}

/// POST /api/orders/:id/cancel
pub async fn cancel(State(s): State<AppState>, user: AuthenticatedUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Order>> {
    let order = s.checkout.cancel(user.user_id, id).await?;
    Ok(ApiResponse::with_message("Order cancelled successfully", order))
}

/// POST /api/orders/:id/items/:index/return
pub async fn request_return(
    State(s): State<AppState>,
    user: AuthenticatedUser,
    Path((id, index)): Path<(Uuid, usize)>,
    JsonBody(body): JsonBody<ReturnBody>,
) -> ApiResult<ApiResponse<Order>> {
    let order = s
        .checkout
        .request_return(user.user_id, id, index, body.request_type, body.reason, body.description.filter(|d| !d.trim().is_empty()))
        .await?;
    Ok(ApiResponse::with_message("Return request submitted", order))
}

/// GET /api/admin/orders
pub async fn admin_list(State(s): State<AppState>, _admin: AdminUser, Query(q): Query<AdminListQuery>) -> ApiResult<ApiResponse<Page<Order>>> {
    let page = PageParams { page: q.page, per_page: q.per_page };
    let (orders, total) = db::orders::list(&s.db, q.status, &page).await?;
    Ok(ApiResponse::ok(Page::new(orders, total, &page)))
}

/// GET /api/admin/orders/:id
pub async fn admin_get(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Order>> {
    let order = db::orders::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Order"))?;
    Ok(ApiResponse::ok(order))
}

/// PATCH /api/admin/orders/:id/status
pub async fn update_status(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, JsonBody(body): JsonBody<StatusBody>) -> ApiResult<ApiResponse<Order>> {
    let order = s.checkout.update_status(id, body.order_status, body.tracking_number).await?;
    Ok(ApiResponse::with_message("Order status updated", order))
}

/// PATCH /api/admin/orders/:id/items/:index/return
pub async fn resolve_return(
    State(s): State<AppState>,
    _admin: AdminUser,
    Path((id, index)): Path<(Uuid, usize)>,
    JsonBody(body): JsonBody<ResolveReturnBody>,
) -> ApiResult<ApiResponse<Order>> {
    let order = s.checkout.resolve_return(id, index, body.status).await?;
    Ok(ApiResponse::with_message("Return status updated", order))
}
