//! Aggregate queries behind the admin dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Order, Product, LOW_STOCK_THRESHOLD};

#[derive(Debug, Serialize)]
pub struct Totals {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub pending_orders: i64,
}

#[derive(Debug, Serialize)]
pub struct LowStockVariant {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_name: String,
    pub stock_quantity: i32,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

pub async fn totals(db: &PgPool) -> Result<Totals, sqlx::Error> {
    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'customer'").fetch_one(db).await?;
    let total_products = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products").fetch_one(db).await?;
    let total_orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders").fetch_one(db).await?;
    let total_revenue = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE payment_status = 'completed'",
    )
    .fetch_one(db).await?;
    let pending_orders = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE order_status = 'pending'").fetch_one(db).await?;
    Ok(Totals { total_users, total_products, total_orders, total_revenue, pending_orders })
}

pub async fn recent_orders(db: &PgPool, limit: i64) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1").bind(limit).fetch_all(db).await
}

/// Variants below the low-stock threshold, scarcest first.
pub async fn low_stock(db: &PgPool) -> Result<Vec<LowStockVariant>, sqlx::Error> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE EXISTS (SELECT 1 FROM jsonb_array_elements(variants) v WHERE (v->>'stock_quantity')::int < $1)",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(db).await?;

    let mut low: Vec<LowStockVariant> = products
        .iter()
        .flat_map(|p| {
            p.low_stock_variants().map(|v| LowStockVariant {
                product_id: p.id,
                product_name: p.name.clone(),
                variant_name: v.name.clone(),
                stock_quantity: v.stock_quantity,
            })
        })
        .collect();
    low.sort_by_key(|v| v.stock_quantity);
    Ok(low)
}

/// Completed-payment orders per day over the last `days` days.
pub async fn sales_by_day(db: &PgPool, days: i32) -> Result<Vec<DailySales>, sqlx::Error> {
    sqlx::query_as::<_, DailySales>(
        "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS orders, COALESCE(SUM(total_amount), 0) AS revenue \
         FROM orders WHERE payment_status = 'completed' AND created_at >= NOW() - make_interval(days => $1) \
         GROUP BY day ORDER BY day",
    )
    .bind(days)
    .fetch_all(db).await
}
