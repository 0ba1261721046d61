use rust_decimal::Decimal;
use sqlx::{types::Json, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::aggregates::{NewProduct, Product, Variant};
use crate::domain::value_objects::Slug;

use super::PageParams;

/// Storefront listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub brand: Option<String>,
}

/// Partial product update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub variants: Option<Vec<Variant>>,
    pub discount_percentage: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Visit {
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn find_by_slug<'e>(db: impl PgExecutor<'e>, slug: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(db).await
}

pub async fn find_by_ids<'e>(db: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) ORDER BY created_at DESC")
        .bind(ids).fetch_all(db).await
}

/// Locks the rows until the surrounding transaction ends. Sorted by id so concurrent checkouts lock in the same order.
pub async fn lock_for_update<'e>(db: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(ids).fetch_all(db).await
}

pub async fn update_variants<'e>(db: impl PgExecutor<'e>, id: Uuid, variants: &[Variant]) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET variants = $2, updated_at = NOW() WHERE id = $1")
        .bind(id).bind(Json(variants))
        .execute(db).await?;
    Ok(())
}

pub async fn slug_exists<'e>(db: impl PgExecutor<'e>, slug: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1)").bind(slug).fetch_one(db).await
}

/// First free slug among `name`, `name-2`, `name-3`...
pub async fn unique_slug(db: &PgPool, base: &Slug) -> Result<Slug, sqlx::Error> {
    if !slug_exists(db, base.as_str()).await? {
        return Ok(base.clone());
    }
    let mut n = 2;
    loop {
        let candidate = base.with_suffix(n);
        if !slug_exists(db, candidate.as_str()).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

pub async fn create<'e>(db: impl PgExecutor<'e>, p: &NewProduct, slug: &Slug) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, slug, description, category_id, brand, image_urls, variants, rating, review_count, \
         discount_percentage, is_active, is_blocked, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, $9, TRUE, FALSE, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(p.name.trim()).bind(slug.as_str()).bind(&p.description).bind(p.category_id)
    .bind(&p.brand).bind(&p.image_urls).bind(Json(&p.variants)).bind(p.discount_percentage)
    .fetch_one(db).await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, u: &ProductUpdate) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
         category_id = COALESCE($4, category_id), brand = COALESCE($5, brand), image_urls = COALESCE($6, image_urls), \
         variants = COALESCE($7, variants), discount_percentage = COALESCE($8, discount_percentage), \
         is_active = COALESCE($9, is_active), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(&u.name).bind(&u.description).bind(u.category_id).bind(&u.brand).bind(&u.image_urls)
    .bind(u.variants.as_ref().map(Json)).bind(u.discount_percentage).bind(u.is_active)
    .fetch_optional(db).await
}

pub async fn set_blocked<'e>(db: impl PgExecutor<'e>, id: Uuid, is_blocked: bool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET is_blocked = $2, updated_at = NOW() WHERE id = $1")
        .bind(id).bind(is_blocked)
        .execute(db).await?;
    Ok(())
}

pub async fn set_rating<'e>(db: impl PgExecutor<'e>, id: Uuid, rating: Decimal, review_count: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET rating = $2, review_count = $3, updated_at = NOW() WHERE id = $1")
        .bind(id).bind(rating).bind(review_count)
        .execute(db).await?;
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE is_active AND NOT is_blocked");
    if let Some(category) = filter.category {
        qb.push(" AND category_id = ").push_bind(category);
    }
    if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        qb.push(" AND brand ILIKE ").push_bind(brand.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone()).push(" OR description ILIKE ").push_bind(pattern).push(")");
    }
}

/// Storefront listing: active and unblocked products, newest first.
pub async fn list_visible(db: &PgPool, filter: &ProductFilter, page: &PageParams) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::new("SELECT * FROM products");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(page.limit()).push(" OFFSET ").push_bind(page.offset());
    let products = qb.build_query_as::<Product>().fetch_all(db).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count, filter);
    let total = count.build_query_scalar::<i64>().fetch_one(db).await?;
    Ok((products, total))
}

/// Admin listing, blocked and inactive included.
pub async fn list_all(db: &PgPool, page: &PageParams) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(db).await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products").fetch_one(db).await?;
    Ok((products, total))
}

pub async fn record_visit<'e>(db: impl PgExecutor<'e>, v: &Visit) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO product_visits (id, product_id, user_id, ip, user_agent, visited_at) VALUES ($1, $2, $3, $4, $5, NOW())")
        .bind(Uuid::now_v7()).bind(v.product_id).bind(v.user_id).bind(&v.ip).bind(&v.user_agent)
        .execute(db).await?;
    Ok(())
}

/// Distinct products the user visited, most recent visit first.
pub async fn recently_visited<'e>(db: impl PgExecutor<'e>, user_id: Uuid, limit: i64) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT p.* FROM products p \
         JOIN (SELECT product_id, MAX(visited_at) AS last_visit FROM product_visits WHERE user_id = $1 GROUP BY product_id) v \
         ON v.product_id = p.id \
         WHERE NOT p.is_blocked ORDER BY v.last_visit DESC LIMIT $2",
    )
    .bind(user_id).bind(limit)
    .fetch_all(db).await
}
