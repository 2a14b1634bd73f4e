//! Aggregates module
pub mod catalog;
pub mod offers;
pub mod cart;
pub mod checkout;

pub use catalog::{seed_products, Catalog, CatalogError, NewProduct};
pub use offers::{NewOffer, OfferBoard};
pub use cart::{AddOutcome, Cart};
pub use checkout::{CheckoutError, CheckoutPolicy, CheckoutStep, CheckoutWizard, DedicationDraft, OrderSummary};
