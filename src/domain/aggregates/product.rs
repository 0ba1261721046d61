//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{apply_discount, Quantity};

pub const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub image_urls: Vec<String>,
    pub variants: Json<Vec<Variant>>,
    pub rating: Decimal,
    pub review_count: i32,
    pub discount_percentage: Decimal,
    pub is_active: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// A sellable size of a product, e.g. `50ml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

/// Input for a new product; persisted by the repository.
#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub image_urls: Vec<String>,
    pub variants: Vec<Variant>,
    pub discount_percentage: Decimal,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.image_urls.is_empty() { return Err(ProductError::NoImages); }
        validate_discount(self.discount_percentage)?;
        validate_variants(&self.variants)
    }
}

pub fn validate_discount(pct: Decimal) -> Result<(), ProductError> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED { return Err(ProductError::InvalidDiscount); }
    Ok(())
}

pub fn validate_variants(variants: &[Variant]) -> Result<(), ProductError> {
    if variants.is_empty() { return Err(ProductError::NoVariants); }
    for (i, v) in variants.iter().enumerate() {
        if v.name.trim().is_empty() { return Err(ProductError::InvalidVariant("variant name is empty".into())); }
        if v.price < Decimal::ZERO { return Err(ProductError::InvalidVariant(format!("{}: negative price", v.name))); }
        if v.stock_quantity < 0 { return Err(ProductError::InvalidVariant(format!("{}: negative stock", v.name))); }
        if variants[..i].iter().any(|o| o.name.eq_ignore_ascii_case(&v.name)) {
            return Err(ProductError::DuplicateVariant(v.name.clone()));
        }
    }
    Ok(())
}

impl Product {
    pub fn is_purchasable(&self) -> bool { self.is_active && !self.is_blocked }

    pub fn variant(&self, name: &str) -> Result<&Variant, ProductError> {
        self.variants.iter().find(|v| v.name == name).ok_or_else(|| ProductError::VariantNotFound(name.to_string()))
    }

    /// Variant price after the product-level discount.
    pub fn unit_price(&self, variant_name: &str) -> Result<Decimal, ProductError> {
        let variant = self.variant(variant_name)?;
        Ok(apply_discount(variant.price, self.discount_percentage))
    }

    pub fn primary_image(&self) -> Option<&str> { self.image_urls.first().map(String::as_str) }

    pub fn ensure_available(&self, variant_name: &str, qty: u32) -> Result<(), ProductError> {
        if !self.is_purchasable() { return Err(ProductError::Unavailable(self.name.clone())); }
        let variant = self.variant(variant_name)?;
        let stock = Quantity::new(variant.stock_quantity.max(0) as u32);
        if stock.subtract(qty).is_none() {
            return Err(ProductError::InsufficientStock { variant: variant.name.clone(), available: variant.stock_quantity });
        }
        Ok(())
    }

    pub fn remove_inventory(&mut self, variant_name: &str, qty: u32) -> Result<(), ProductError> {
        self.ensure_available(variant_name, qty)?;
        let id = self.id;
        let variant = self.variant_mut(variant_name)?;
        variant.stock_quantity -= qty as i32;
        let depleted = variant.stock_quantity == 0;
        let name = variant.name.clone();
        if depleted { self.raise_event(DomainEvent::Product(ProductEvent::StockDepleted { product_id: id, variant_name: name })); }
        self.touch();
        Ok(())
    }

    /// Puts stock back, e.g. when a confirmed order is cancelled. Unknown variants are ignored.
    pub fn add_inventory(&mut self, variant_name: &str, qty: u32) {
        if let Ok(variant) = self.variant_mut(variant_name) {
            variant.stock_quantity = variant.stock_quantity.saturating_add(qty as i32);
            self.touch();
        }
    }

    pub fn toggle_block(&mut self) -> bool {
        self.is_blocked = !self.is_blocked;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::BlockToggled { product_id: self.id, is_blocked: self.is_blocked }));
        self.is_blocked
    }

    pub fn low_stock_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.stock_quantity < LOW_STOCK_THRESHOLD)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    pub(crate) fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn variant_mut(&mut self, name: &str) -> Result<&mut Variant, ProductError> {
        self.variants.0.iter_mut().find(|v| v.name == name).ok_or_else(|| ProductError::VariantNotFound(name.to_string()))
    }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    MissingName,
    NoImages,
    NoVariants,
    InvalidDiscount,
    InvalidVariant(String),
    DuplicateVariant(String),
    VariantNotFound(String),
    Unavailable(String),
    InsufficientStock { variant: String, available: i32 },
}
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::NoImages => write!(f, "At least one product image is required"),
            Self::NoVariants => write!(f, "At least one variant is required"),
            Self::InvalidDiscount => write!(f, "Discount percentage must be between 0 and 100"),
            Self::InvalidVariant(msg) => write!(f, "Invalid variant: {}", msg),
            Self::DuplicateVariant(name) => write!(f, "Duplicate variant: {}", name),
            Self::VariantNotFound(name) => write!(f, "Variant not found: {}", name),
            Self::Unavailable(name) => write!(f, "Product is not available: {}", name),
            Self::InsufficientStock { variant, available } => write!(f, "Insufficient stock for {} (available: {})", variant, available),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(), name: "Rose Toner".into(), slug: "rose-toner".into(), description: None,
            category_id: None, brand: Some("Comix".into()), image_urls: vec!["https://img/1.png".into()],
            variants: Json(vec![
                Variant { name: "50ml".into(), price: Decimal::new(400, 0), stock_quantity: 3 },
                Variant { name: "150ml".into(), price: Decimal::new(900, 0), stock_quantity: 0 },
            ]),
            rating: Decimal::ZERO, review_count: 0, discount_percentage: Decimal::new(10, 0),
            is_active: true, is_blocked: false, created_at: now, updated_at: now, events: vec![],
        }
    }

    #[test]
    fn test_unit_price_applies_discount() {
        let p = sample_product();
        assert_eq!(p.unit_price("50ml").unwrap(), Decimal::new(360, 0));
        assert_eq!(p.unit_price("250ml"), Err(ProductError::VariantNotFound("250ml".into())));
    }

    #[test]
    fn test_inventory() {
        let mut p = sample_product();
        assert!(p.ensure_available("50ml", 3).is_ok());
        assert!(matches!(p.ensure_available("50ml", 4), Err(ProductError::InsufficientStock { available: 3, .. })));
        assert!(p.ensure_available("150ml", 1).is_err());
        p.remove_inventory("50ml", 3).unwrap();
        assert_eq!(p.variant("50ml").unwrap().stock_quantity, 0);
        assert_eq!(p.take_events().len(), 1);
        p.add_inventory("50ml", 2);
        assert_eq!(p.variant("50ml").unwrap().stock_quantity, 2);
    }

    #[test]
    fn test_blocked_product_is_not_purchasable() {
        let mut p = sample_product();
        assert!(p.toggle_block());
        assert!(matches!(p.ensure_available("50ml", 1), Err(ProductError::Unavailable(_))));
        assert!(!p.toggle_block());
    }

    #[test]
    fn test_validate_variants() {
        let v = |n: &str, price: i64| Variant { name: n.into(), price: Decimal::new(price, 0), stock_quantity: 1 };
        assert!(validate_variants(&[v("50ml", 10), v("150ml", 20)]).is_ok());
        assert_eq!(validate_variants(&[]), Err(ProductError::NoVariants));
        assert_eq!(validate_variants(&[v("50ml", 10), v("50ML", 20)]), Err(ProductError::DuplicateVariant("50ML".into())));
        assert!(validate_variants(&[v("50ml", -1)]).is_err());
    }
}
