//! Postgres repositories, one module per resource.
//!
//! Functions take any `PgExecutor`, so the same query runs against the pool
//! or inside a transaction (`&mut *tx`).

use serde::{Deserialize, Serialize};

pub mod banners;
pub mod carts;
pub mod categories;
pub mod dashboard;
pub mod favourites;
pub mod newsletter;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reports;
pub mod reviews;
pub mod tokens;
pub mod users;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page()) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * self.limit() }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, params: &PageParams) -> Self {
        Self { data, total, page: params.page(), per_page: params.per_page() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params() {
        let p = PageParams { page: Some(3), per_page: Some(500) };
        assert_eq!(p.per_page(), 100);
        assert_eq!(p.offset(), 200);
        let d = PageParams::default();
        assert_eq!((d.page(), d.per_page(), d.offset()), (1, 20, 0));
        assert_eq!(PageParams { page: Some(0), per_page: Some(0) }.offset(), 0);
    }
}
