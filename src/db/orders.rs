use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{NewOrder, Order, OrderStatus};
use crate::domain::value_objects::DEFAULT_CURRENCY;

use super::PageParams;

pub async fn insert<'e>(db: impl PgExecutor<'e>, o: &NewOrder) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_no, user_id, is_guest, guest_info, items, subtotal, discount_amount, shipping_fee, \
         total_amount, shipping_address, payment_method, payment_status, order_status, razorpay_order_id, offer_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(&o.order_no).bind(o.user_id).bind(o.user_id.is_none()).bind(o.guest_info.as_ref().map(Json))
    .bind(Json(&o.items)).bind(o.totals.subtotal).bind(o.totals.discount_amount).bind(o.totals.shipping_fee)
    .bind(o.totals.total_amount).bind(Json(&o.shipping_address)).bind(o.payment_method).bind(o.payment_status)
    .bind(o.order_status).bind(&o.razorpay_order_id).bind(o.offer_id)
    .fetch_one(db).await
}

pub async fn find_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(db).await
}

/// Row-locks the order for the rest of the transaction.
pub async fn lock_by_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(db).await
}

pub async fn lock_by_razorpay_id<'e>(db: impl PgExecutor<'e>, razorpay_order_id: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE razorpay_order_id = $1 FOR UPDATE")
        .bind(razorpay_order_id).fetch_optional(db).await
}

pub async fn list_for_user<'e>(db: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id).fetch_all(db).await
}

pub async fn list(db: &PgPool, status: Option<OrderStatus>, page: &PageParams) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR order_status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status).bind(page.limit()).bind(page.offset())
    .fetch_all(db).await?;
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR order_status = $1)")
        .bind(status).fetch_one(db).await?;
    Ok((orders, total))
}

/// Writes back the mutable state of an order after the aggregate has changed it.
pub async fn save<'e>(db: impl PgExecutor<'e>, o: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET items = $2, payment_status = $3, order_status = $4, tracking_number = $5, \
         payment_details = $6, updated_at = $7 WHERE id = $1",
    )
    .bind(o.id).bind(Json(&o.items.0)).bind(o.payment_status).bind(o.order_status).bind(&o.tracking_number)
    .bind(o.payment_details.as_ref().map(|d| Json(&d.0))).bind(o.updated_at)
    .execute(db).await?;
    Ok(())
}

/// Settlement record for a confirmed order.
pub async fn insert_payment<'e>(db: impl PgExecutor<'e>, o: &Order) -> Result<(), sqlx::Error> {
    let payment_id = o.payment_details.as_ref().map(|d| d.razorpay_payment_id.clone());
    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, is_guest, guest_email, payment_method, payment_status, \
         razorpay_order_id, razorpay_payment_id, amount, currency, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())",
    )
    .bind(Uuid::now_v7()).bind(o.id).bind(o.user_id).bind(o.is_guest).bind(o.customer_email())
    .bind(o.payment_method).bind(o.payment_status).bind(&o.razorpay_order_id).bind(payment_id)
    .bind(o.total_amount).bind(DEFAULT_CURRENCY)
    .execute(db).await?;
    Ok(())
}

/// Drops Razorpay orders still waiting for a payment that never arrived.
/// Cancelled or otherwise progressed orders stay as history.
pub async fn delete_stale_pending<'e>(db: impl PgExecutor<'e>, created_before: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM orders WHERE payment_method = 'razorpay' AND payment_status = 'pending' \
         AND order_status = 'pending' AND created_at < $1",
    )
    .bind(created_before)
    .execute(db).await?;
    Ok(result.rows_affected())
}
