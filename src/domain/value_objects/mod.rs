//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Rounds a monetary amount to two decimals, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Applies a percentage discount to a price.
pub fn apply_discount(price: Decimal, percentage: Decimal) -> Decimal {
    let pct = percentage.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    round_money(price * (Decimal::ONE_HUNDRED - pct) / Decimal::ONE_HUNDRED)
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn inr(amount: Decimal) -> Self { Self::new(amount, DEFAULT_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Amount in the currency's minor unit (paise for INR), as payment gateways expect.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let minor = (self.amount * Decimal::ONE_HUNDRED).round();
        i64::try_from(minor).map_err(|_| MoneyError::OutOfRange)
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.currency == DEFAULT_CURRENCY { "₹" } else { "" };
        write!(f, "{}{:.2}", symbol, round_money(self.amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, OutOfRange }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::CurrencyMismatch => write!(f, "Currency mismatch"), Self::OutOfRange => write!(f, "Amount out of range") }
    }
}

/// URL-safe product handle derived from its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() { out.push('-'); }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        if out.is_empty() { return Err(SlugError::Empty); }
        if out.len() > 120 { out.truncate(120); while out.ends_with('-') { out.pop(); } }
        Ok(Self(out))
    }

    /// `rose-toner` -> `rose-toner-2` for the second product with the same name.
    pub fn with_suffix(&self, n: u32) -> Slug {
        if n <= 1 { self.clone() } else { Slug(format!("{}-{}", self.0, n)) }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Name must contain letters or digits") }
}

/// Email address, trimmed and lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(value: &str) -> Result<Self, EmailError> {
        let value = value.trim().to_lowercase();
        if value.is_empty() { return Err(EmailError::Empty); }
        if value.len() > 254 || value.chars().any(char::is_whitespace) { return Err(EmailError::Invalid(value)); }
        let Some((local, domain)) = value.split_once('@') else { return Err(EmailError::Invalid(value)); };
        let domain_ok = domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !domain.contains('@')
            && domain.rsplit('.').next().is_some_and(|tld| tld.len() >= 2);
        if local.is_empty() || !domain_ok { return Err(EmailError::Invalid(value)); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum EmailError { Empty, Invalid(String) }
impl std::error::Error for EmailError {}
impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Email is required"), Self::Invalid(v) => write!(f, "Please enter a valid email: {}", v) }
    }
}

/// Units on hand for a variant. Never negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn subtract(&self, other: u32) -> Option<Self> { self.0.checked_sub(other).map(Self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(Slug::from_name("  Rose Water Toner (50ml)! ").unwrap().as_str(), "rose-water-toner-50ml");
        assert_eq!(Slug::from_name("Vitamin C").unwrap().with_suffix(2).as_str(), "vitamin-c-2");
        assert_eq!(Slug::from_name("Vitamin C").unwrap().with_suffix(1).as_str(), "vitamin-c");
        assert!(Slug::from_name("!!!").is_err());
    }

    #[test]
    fn test_money_add() {
        let a = Money::inr(Decimal::new(100, 0));
        let b = Money::inr(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "USD")).is_err());
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::inr(Decimal::new(49950, 2)).to_minor_units().unwrap(), 49950);
        assert_eq!(Money::inr(Decimal::new(10350, 2)).to_string(), "₹103.50");
    }

    #[test]
    fn test_discount() {
        assert_eq!(apply_discount(Decimal::new(999, 0), Decimal::new(15, 0)), Decimal::new(84915, 2));
        assert_eq!(apply_discount(Decimal::new(100, 0), Decimal::new(150, 0)), Decimal::ZERO);
        assert_eq!(apply_discount(Decimal::new(333, 1), Decimal::new(10, 0)), Decimal::new(2997, 2));
    }

    #[test]
    fn test_email() {
        assert_eq!(EmailAddress::parse(" Jane.Doe@Example.COM ").unwrap().as_str(), "jane.doe@example.com");
        assert!(EmailAddress::parse("no-at-sign").is_err());
        assert!(EmailAddress::parse("a@b").is_err());
        assert!(EmailAddress::parse("a b@c.com").is_err());
        assert_eq!(EmailAddress::parse("   "), Err(EmailError::Empty));
    }
}
