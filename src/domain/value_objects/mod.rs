//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Product identifier. Seed products carry short literal ids, new ones a v7 uuid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self { Self::new(value) }
}

/// Offer identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(String);

impl OfferId {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Money value object, in whole currency units (Colombian pesos have no minor unit in practice).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(amount: u64) -> Self { Self(amount) }
    pub const fn amount(&self) -> u64 { self.0 }
    pub const fn is_zero(&self) -> bool { self.0 == 0 }
    pub fn add(&self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(u64::from(qty))) }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::ZERO, |acc, m| acc.add(m)) }
}

/// Renders as `$85.000`, the es-CO grouping shoppers see on the storefront.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push('.'); }
            grouped.push(ch);
        }
        write!(f, "${grouped}")
    }
}
