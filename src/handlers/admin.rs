//! Admin dashboard figures.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::db::dashboard::{self, DailySales, LowStockVariant, Totals};
use crate::domain::aggregates::Order;
use crate::error::ApiResult;
use crate::middleware::AdminUser;
use crate::state::AppState;

const RECENT_ORDERS: i64 = 5;
const DEFAULT_SALES_DAYS: u32 = 30;
const MAX_SALES_DAYS: u32 = 365;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub totals: Totals,
    pub recent_orders: Vec<Order>,
    pub low_stock: Vec<LowStockVariant>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery { pub days: Option<u32> }

impl SalesQuery {
    fn days(&self) -> u32 { self.days.unwrap_or(DEFAULT_SALES_DAYS).clamp(1, MAX_SALES_DAYS) }
}

/// GET /api/admin/dashboard
pub async fn dashboard(State(s): State<AppState>, _admin: AdminUser) -> ApiResult<ApiResponse<Dashboard>> {
    let totals = dashboard::totals(&s.db).await?;
    let recent_orders = dashboard::recent_orders(&s.db, RECENT_ORDERS).await?;
    let low_stock = dashboard::low_stock(&s.db).await?;
    Ok(ApiResponse::ok(Dashboard { totals, recent_orders, low_stock }))
}

/// GET /api/admin/sales
pub async fn sales(State(s): State<AppState>, _admin: AdminUser, Query(q): Query<SalesQuery>) -> ApiResult<ApiResponse<Vec<DailySales>>> {
    let days = q.days() as i32;
    Ok(ApiResponse::ok(dashboard::sales_by_day(&s.db, days).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_days_clamped() {
        assert_eq!(SalesQuery { days: None }.days(), 30);
        assert_eq!(SalesQuery { days: Some(0) }.days(), 1);
        assert_eq!(SalesQuery { days: Some(1000) }.days(), 365);
        assert_eq!(SalesQuery { days: Some(7) }.days(), 7);
    }
}
