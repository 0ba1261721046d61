use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem};

const ITEM_COLUMNS: &str = "ci.id, ci.cart_id, ci.product_id, p.name AS product_name, p.image_urls[1] AS image_url, \
                            ci.variant_name, ci.quantity, ci.price, ci.total_price";

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> Result<Option<Cart>, sqlx::Error> {
    let Some(cart_id) = sqlx::query_scalar::<_, Uuid>("SELECT id FROM carts WHERE user_id = $1").bind(user_id).fetch_optional(db).await? else {
        return Ok(None);
    };
    let items = sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {} FROM cart_items ci JOIN products p ON p.id = ci.product_id WHERE ci.cart_id = $1 ORDER BY ci.created_at",
        ITEM_COLUMNS
    ))
    .bind(cart_id)
    .fetch_all(db)
    .await?;
    Ok(Some(Cart::new(cart_id, user_id, items)))
}

/// The user's cart, created empty on first use.
pub async fn find_or_create(db: &PgPool, user_id: Uuid) -> Result<Cart, sqlx::Error> {
    if let Some(cart) = find_by_user(db, user_id).await? {
        return Ok(cart);
    }
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO carts (id, user_id, created_at, updated_at) VALUES ($1, $2, NOW(), NOW()) \
         ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() RETURNING id",
    )
    .bind(Uuid::now_v7()).bind(user_id)
    .fetch_one(db).await?;
    Ok(Cart::new(id, user_id, Vec::new()))
}

/// Writes a line as the cart aggregate computed it.
pub async fn upsert_item<'e>(db: impl PgExecutor<'e>, item: &CartItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, variant_name, quantity, price, total_price, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
         ON CONFLICT (cart_id, product_id, variant_name) DO UPDATE \
         SET quantity = EXCLUDED.quantity, price = EXCLUDED.price, total_price = EXCLUDED.total_price, updated_at = NOW()",
    )
    .bind(item.id).bind(item.cart_id).bind(item.product_id).bind(&item.variant_name)
    .bind(item.quantity).bind(item.price).bind(item.total_price)
    .execute(db).await?;
    Ok(())
}

pub async fn delete_item<'e>(db: impl PgExecutor<'e>, cart_id: Uuid, product_id: Uuid, variant_name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2 AND variant_name = $3")
        .bind(cart_id).bind(product_id).bind(variant_name)
        .execute(db).await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes the cart; its items go with it.
pub async fn delete_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
