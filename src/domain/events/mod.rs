//! Domain events
use crate::domain::value_objects::{Money, ProductId};
use crate::PaymentMethod;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Catalog(CatalogEvent),
    Cart(CartEvent),
    Checkout(CheckoutEvent),
}

/// `matched` is false when the id was not in the catalog; the event is raised anyway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogEvent {
    ProductAdded { product_id: ProductId, name: String },
    ProductUpdated { product_id: ProductId, matched: bool },
    ProductDeleted { product_id: ProductId, matched: bool },
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { product_id: ProductId, name: String },
    QuantityIncremented { product_id: ProductId, quantity: u32 },
    QuantityChanged { product_id: ProductId, quantity: u32 },
    ItemRemoved { product_id: ProductId },
    Cleared,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutEvent {
    Advanced { step: u8 },
    SteppedBack { step: u8 },
    Submitted { total: Money, payment_method: PaymentMethod },
    Closed { reset: bool },
}
