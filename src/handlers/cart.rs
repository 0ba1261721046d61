//! Cart endpoints. Lines are priced from the product's current variant when added.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use super::{validated, ApiResponse, JsonBody};
use crate::db;
use crate::domain::aggregates::{Cart, CartItem, CartSummary, LineRequest};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemBody {
    pub product_id: Uuid,
    #[validate(length(min = 1, message = "variant_name is required"))]
    pub variant_name: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody { pub product_id: Uuid, pub variant_name: String, pub quantity: u32 }

#[derive(Debug, Deserialize)]
pub struct RemoveItemBody { pub product_id: Uuid, pub variant_name: String }

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: Option<Uuid>,
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub summary: CartSummary,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let summary = cart.summary();
        Self { id: Some(cart.id()), items: cart.into_items(), summary }
    }
}

impl CartView {
    fn empty(user_id: Uuid) -> Self { Cart::new(Uuid::nil(), user_id, Vec::new()).into() }
}

/// GET /api/cart
pub async fn get(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<CartView>> {
    let view = match db::carts::find_by_user(&s.db, user.user_id).await? {
        Some(cart) => cart.into(),
        None => CartView { id: None, ..CartView::empty(user.user_id) },
    };
    Ok(ApiResponse::ok(view))
}

/// POST /api/cart/items
pub async fn add_item(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<AddItemBody>) -> ApiResult<ApiResponse<CartView>> {
    let body = validated(body)?;
    let product = db::products::find_by_id(&s.db, body.product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    let mut cart = db::carts::find_or_create(&s.db, user.user_id).await?;

    let already = cart.find(product.id, &body.variant_name).map_or(0, |i| i.quantity.max(0) as u32);
    product.ensure_available(&body.variant_name, already.saturating_add(body.quantity))?;
    let line = LineRequest {
        product_id: product.id,
        product_name: product.name.clone(),
        image_url: product.primary_image().map(str::to_string),
        variant_name: body.variant_name.clone(),
        quantity: body.quantity,
        unit_price: product.unit_price(&body.variant_name)?,
    };
    let item = cart.add_item(line)?.clone();
    db::carts::upsert_item(&s.db, &item).await?;
    Ok(ApiResponse::with_message("Item added to cart", cart.into()))
}

/// PUT /api/cart/items. Quantity 0 removes the line.
pub async fn update_item(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<UpdateItemBody>) -> ApiResult<ApiResponse<CartView>> {
    let mut cart = db::carts::find_by_user(&s.db, user.user_id).await?.ok_or_else(|| ApiError::not_found("Cart"))?;
    if body.quantity > 0 {
        let product = db::products::find_by_id(&s.db, body.product_id).await?.ok_or_else(|| ApiError::not_found("Product"))?;
        product.ensure_available(&body.variant_name, body.quantity)?;
    }
    let updated = cart.update_quantity(body.product_id, &body.variant_name, body.quantity)?.cloned();
    match updated {
        Some(item) => db::carts::upsert_item(&s.db, &item).await?,
        None => {
            db::carts::delete_item(&s.db, cart.id(), body.product_id, &body.variant_name).await?;
        }
    }
    Ok(ApiResponse::with_message("Cart updated", cart.into()))
}

/// DELETE /api/cart/items
pub async fn remove_item(State(s): State<AppState>, user: AuthenticatedUser, JsonBody(body): JsonBody<RemoveItemBody>) -> ApiResult<ApiResponse<CartView>> {
    let mut cart = db::carts::find_by_user(&s.db, user.user_id).await?.ok_or_else(|| ApiError::not_found("Cart"))?;
    cart.remove_item(body.product_id, &body.variant_name)?;
    db::carts::delete_item(&s.db, cart.id(), body.product_id, &body.variant_name).await?;
    Ok(ApiResponse::with_message("Item removed from cart", cart.into()))
}

/// DELETE /api/cart
pub async fn clear(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<Value>> {
    db::carts::delete_for_user(&s.db, user.user_id).await?;
    Ok(ApiResponse::with_message("Cart cleared", Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cart_view() {
        let view = CartView { id: None, ..CartView::empty(Uuid::nil()) };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["item_count"], 0);
        assert!(json["id"].is_null());
    }

    #[test]
    fn test_add_body_validation() {
        let body = AddItemBody { product_id: Uuid::nil(), variant_name: "50ml".into(), quantity: 0 };
        assert!(body.validate().is_err());
    }
}
