//! Palo Rosa Florist Storefront
//!
//! Application core for a florist shop storefront and admin console.
//!
//! ## Features
//! - Product catalog management
//! - Shopping cart with derived totals
//! - Three-step checkout wizard (review, dedication, delivery)
//! - Promotional offers
//! - Write-through persistence over a swappable key-value backend
//! - Auto-expiring notifications and blocking alerts
//! - Card message and product image drafting through a content assistant

pub mod admin;
pub mod assistant;
pub mod config;
pub mod domain;
pub mod http;
pub mod notifications;
pub mod store;
pub mod storefront;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use domain::value_objects::{Money, OfferId, ProductId};
pub use storefront::Storefront;

// =============================================================================
// Core Types
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Data URI or remote URL.
    pub image: String,
    pub category: Category,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Flowers,
    Plants,
    Orchids,
    Gifts,
    Preserved,
}

/// A cart line: the product snapshot plus how many of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.product.price.multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub title: String,
    pub description: String,
    pub image: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Nequi,
    Daviplata,
    Cash,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nequi => "Nequi",
            Self::Daviplata => "DaviPlata",
            Self::Cash => "Efectivo",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub notes: String,
    pub payment_method: PaymentMethod,
    pub card_message: Option<String>,
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Checkout error: {0}")]
    Checkout(#[from] domain::aggregates::CheckoutError),

    #[error("Assistant unavailable: {0}")]
    Assistant(String),

    #[error("Admin login required")]
    Unauthorized,
}

impl From<domain::aggregates::CatalogError> for ShopError {
    fn from(err: domain::aggregates::CatalogError) -> Self { Self::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, ShopError>;
