//! Catalog endpoints. Create and update take multipart bodies with image files.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{ApiResponse, ClientIp, FormParts, JsonBody};
use crate::db::{
    self,
    products::{ProductFilter, ProductUpdate, Visit},
    Page, PageParams,
};
use crate::domain::aggregates::{
    product::{validate_discount, validate_variants},
    NewProduct, Product, Variant,
};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Slug;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{AdminUser, AuthenticatedUser, OptionalUser};
use crate::services::ImageUpload;
use crate::state::AppState;

const MAX_CREATE_IMAGES: usize = 7;
const MAX_UPDATE_IMAGES: usize = 10;
const RECENTLY_VISITED_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub brand: Option<String>,
}

impl ListQuery {
    fn split(self) -> (PageParams, ProductFilter) {
        (
            PageParams { page: self.page, per_page: self.per_page },
            ProductFilter { category: self.category, search: self.search, brand: self.brand },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ByIdsBody { pub product_ids: Vec<Uuid> }

fn check_image_count(images: &[ImageUpload], max: usize) -> ApiResult<()> {
    if images.len() > max {
        return Err(ApiError::BadRequest(format!("At most {} images are allowed", max)));
    }
    Ok(())
}

async fn load(s: &AppState, id: Uuid) -> ApiResult<Product> {
    db::products::find_by_id(&s.db, id).await?.ok_or_else(|| ApiError::not_found("Product"))
}

/// GET /api/products
pub async fn list(State(s): State<AppState>, Query(q): Query<ListQuery>) -> ApiResult<ApiResponse<Page<Product>>> {
    let (page, filter) = q.split();
    let (products, total) = db::products::list_visible(&s.db, &filter, &page).await?;
    Ok(ApiResponse::ok(Page::new(products, total, &page)))
}

/// GET /api/admin/products
pub async fn list_all(State(s): State<AppState>, _admin: AdminUser, Query(page): Query<PageParams>) -> ApiResult<ApiResponse<Page<Product>>> {
    let (products, total) = db::products::list_all(&s.db, &page).await?;
    Ok(ApiResponse::ok(Page::new(products, total, &page)))
}

/// GET /api/products/:id
pub async fn get(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(load(&s, id).await?))
}

/// GET /api/products/slug/:slug
pub async fn get_by_slug(State(s): State<AppState>, Path(slug): Path<String>) -> ApiResult<ApiResponse<Product>> {
    let product = db::products::find_by_slug(&s.db, &slug).await?.ok_or_else(|| ApiError::not_found("Product"))?;
    Ok(ApiResponse::ok(product))
}

/// POST /api/products/by-ids
pub async fn by_ids(State(s): State<AppState>, JsonBody(body): JsonBody<ByIdsBody>) -> ApiResult<ApiResponse<Vec<Product>>> {
    if body.product_ids.len() > db::MAX_PER_PAGE as usize {
        return Err(ApiError::BadRequest(format!("At most {} product ids per request", db::MAX_PER_PAGE)));
    }
    Ok(ApiResponse::ok(db::products::find_by_ids(&s.db, &body.product_ids).await?))
}

/// POST /api/products (multipart)
pub async fn create(State(s): State<AppState>, _admin: AdminUser, multipart: Multipart) -> ApiResult<(StatusCode, ApiResponse<Product>)> {
    let mut form = FormParts::read(multipart).await?;
    let images = form.take_images("images");
    check_image_count(&images, MAX_CREATE_IMAGES)?;
    let mut draft = NewProduct {
        name: form.required("name")?,
        description: form.text("description"),
        category_id: form.parse::<Uuid>("category_id")?,
        brand: form.text("brand"),
        image_urls: Vec::new(),
        variants: form.json::<Vec<Variant>>("variants")?.unwrap_or_default(),
        discount_percentage: form.parse::<Decimal>("discount_percentage")?.unwrap_or(Decimal::ZERO),
    };
    if images.is_empty() {
        return Err(ApiError::BadRequest("At least one product image is required".to_string()));
    }
    validate_variants(&draft.variants)?;
    validate_discount(draft.discount_percentage)?;
    if let Some(category_id) = draft.category_id {
        db::categories::find_by_id(&s.db, category_id).await?.ok_or_else(|| ApiError::not_found("Category"))?;
    }

    let slug = db::products::unique_slug(&s.db, &Slug::from_name(&draft.name)?).await?;
    draft.image_urls = s.media.upload_all(images, "products").await?;
    draft.validate()?;
    let mut product = db::products::create(&s.db, &draft, &slug).await?;
    product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: product.id, slug: product.slug.clone() }));
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    s.events.publish_all(product.take_events()).await;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Product created successfully", product)))
}

/// PUT /api/products/:id (multipart). New images replace the current list.
pub async fn update(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>, multipart: Multipart) -> ApiResult<ApiResponse<Product>> {
    let mut form = FormParts::read(multipart).await?;
    let images = form.take_images("images");
    check_image_count(&images, MAX_UPDATE_IMAGES)?;
    let existing = load(&s, id).await?;

    let variants = form.json::<Vec<Variant>>("variants")?;
    if let Some(variants) = &variants {
        validate_variants(variants)?;
    }
    let discount_percentage = form.parse::<Decimal>("discount_percentage")?;
    if let Some(pct) = discount_percentage {
        validate_discount(pct)?;
    }
    let image_urls = if images.is_empty() { None } else { Some(s.media.upload_all(images, "products").await?) };
    let update = ProductUpdate {
        name: form.text("name"),
        description: form.text("description"),
        category_id: form.parse::<Uuid>("category_id")?,
        brand: form.text("brand"),
        image_urls: image_urls.clone(),
        variants,
        discount_percentage,
        is_active: form.parse::<bool>("is_active")?,
    };
    let product = db::products::update(&s.db, id, &update).await?.ok_or_else(|| ApiError::not_found("Product"))?;

    if image_urls.is_some() {
        for url in &existing.image_urls {
            if let Err(e) = s.media.destroy_by_url(url).await {
                tracing::warn!(url = %url, error = %e, "Failed to delete replaced product image");
            }
        }
    }
    Ok(ApiResponse::with_message("Product updated successfully", product))
}

/// PATCH /api/products/:id/block
pub async fn toggle_block(State(s): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> ApiResult<ApiResponse<Product>> {
    let mut product = load(&s, id).await?;
    let blocked = product.toggle_block();
    db::products::set_blocked(&s.db, id, blocked).await?;
    s.events.publish_all(product.take_events()).await;
    let message = if blocked { "Product blocked successfully" } else { "Product unblocked successfully" };
    Ok(ApiResponse::with_message(message, product))
}

/// POST /api/products/:id/visit
pub async fn record_visit(
    State(s): State<AppState>,
    OptionalUser(user): OptionalUser,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<Value>> {
    load(&s, id).await?;
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_string);
    let visit = Visit { product_id: id, user_id: user.map(|u| u.user_id), ip, user_agent };
    db::products::record_visit(&s.db, &visit).await?;
    Ok(ApiResponse::with_message("Visit recorded", Value::Null))
}

/// GET /api/products/recently-visited
pub async fn recently_visited(State(s): State<AppState>, user: AuthenticatedUser) -> ApiResult<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok(db::products::recently_visited(&s.db, user.user_id, RECENTLY_VISITED_LIMIT).await?))
}
