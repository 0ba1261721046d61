//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{round_money, Money, DEFAULT_CURRENCY};

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    id: Uuid,
    user_id: Uuid,
    items: Vec<CartItem>,
}

/// A cart line, loaded joined with its product's display fields.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub variant_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
}

impl CartItem {
    pub fn line_total(&self) -> Money { Money::inr(self.price).multiply(self.quantity.max(0) as u32) }
    fn matches(&self, product_id: Uuid, variant_name: &str) -> bool { self.product_id == product_id && self.variant_name == variant_name }
    fn reprice(&mut self) { self.total_price = round_money(self.line_total().amount()); }
}

/// What a caller wants to put into the cart.
#[derive(Clone, Debug)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub variant_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartSummary {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Decimal,
}

impl Cart {
    pub fn new(id: Uuid, user_id: Uuid, items: Vec<CartItem>) -> Self { Self { id, user_id, items } }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn into_items(self) -> Vec<CartItem> { self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn find(&self, product_id: Uuid, variant_name: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.matches(product_id, variant_name))
    }

    /// Adds a line or merges it into an existing one. Returns the resulting line.
    pub fn add_item(&mut self, line: LineRequest) -> Result<&CartItem, CartError> {
        if line.quantity == 0 { return Err(CartError::InvalidQuantity); }
        let qty = i32::try_from(line.quantity).map_err(|_| CartError::InvalidQuantity)?;
        let pos = match self.items.iter().position(|i| i.matches(line.product_id, &line.variant_name)) {
            Some(pos) => {
                let existing = &mut self.items[pos];
                existing.quantity = existing.quantity.checked_add(qty).ok_or(CartError::InvalidQuantity)?;
                existing.price = line.unit_price;
                existing.reprice();
                pos
            }
            None => {
                let mut item = CartItem {
                    id: Uuid::now_v7(), cart_id: self.id, product_id: line.product_id, product_name: line.product_name,
                    image_url: line.image_url, variant_name: line.variant_name, quantity: qty,
                    price: line.unit_price, total_price: Decimal::ZERO,
                };
                item.reprice();
                self.items.push(item);
                self.items.len() - 1
            }
        };
        Ok(&self.items[pos])
    }

    /// Sets an absolute quantity. Zero removes the line and returns `None`.
    pub fn update_quantity(&mut self, product_id: Uuid, variant_name: &str, quantity: u32) -> Result<Option<&CartItem>, CartError> {
        let pos = self.items.iter().position(|i| i.matches(product_id, variant_name)).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.remove(pos);
            return Ok(None);
        }
        let item = &mut self.items[pos];
        item.quantity = i32::try_from(quantity).map_err(|_| CartError::InvalidQuantity)?;
        item.reprice();
        Ok(Some(&self.items[pos]))
    }

    pub fn remove_item(&mut self, product_id: Uuid, variant_name: &str) -> Result<CartItem, CartError> {
        let pos = self.items.iter().position(|i| i.matches(product_id, variant_name)).ok_or(CartError::ItemNotFound)?;
        Ok(self.items.remove(pos))
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn subtotal(&self) -> Money {
        self.items.iter().fold(Money::zero(DEFAULT_CURRENCY), |acc, i| acc.add(&i.line_total()).unwrap_or(acc))
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            item_count: self.items.len(),
            total_quantity: self.items.iter().map(|i| i64::from(i.quantity)).sum(),
            subtotal: round_money(self.subtotal().amount()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity, Empty }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Product not found in cart"),
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::Empty => write!(f, "No items in cart"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, variant: &str, qty: u32, price: i64) -> LineRequest {
        LineRequest { product_id, product_name: "Widget".into(), image_url: None, variant_name: variant.into(), quantity: qty, unit_price: Decimal::new(price, 0) }
    }

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        cart.add_item(line(p1, "50ml", 2, 10)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        let merged = cart.add_item(line(p1, "50ml", 1, 10)).unwrap();
        assert_eq!(merged.quantity, 3); // Merged
        assert_eq!(merged.total_price, Decimal::new(30, 0));
        cart.add_item(line(p1, "150ml", 1, 25)).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.summary().subtotal, Decimal::new(55, 0));
        assert_eq!(cart.summary().total_quantity, 4);
    }

    #[test]
    fn test_update_and_remove() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4(), Uuid::new_v4(), vec![]);
        cart.add_item(line(p1, "50ml", 2, 10)).unwrap();
        assert_eq!(cart.update_quantity(p1, "50ml", 5).unwrap().unwrap().total_price, Decimal::new(50, 0));
        assert!(cart.update_quantity(p1, "50ml", 0).unwrap().is_none());
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item(p1, "50ml").unwrap_err(), CartError::ItemNotFound);
        assert_eq!(cart.add_item(line(p1, "50ml", 0, 10)).unwrap_err(), CartError::InvalidQuantity);
    }
}
