//! Cart Aggregate

use tracing::debug;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Money, ProductId};
use crate::{CartItem, Product};

/// Shopping cart. One line per product id, every line has quantity >= 1.
#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    events: Vec<DomainEvent>,
}

/// What [`Cart::add`] did with the product.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Incremented { quantity: u32 },
}

impl Cart {
    /// Rebuilds a cart from persisted lines, merging duplicate ids and dropping zero quantities.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::default();
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            match cart.items.iter_mut().find(|i| i.product.id == item.product.id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line(&self, id: &ProductId) -> Option<&CartItem> { self.items.iter().find(|i| &i.product.id == id) }

    pub fn add(&mut self, product: &Product) -> AddOutcome {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(1);
            let quantity = existing.quantity;
            self.raise_event(DomainEvent::Cart(CartEvent::QuantityIncremented { product_id: product.id.clone(), quantity }));
            return AddOutcome::Incremented { quantity };
        }
        self.items.push(CartItem { product: product.clone(), quantity: 1 });
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded { product_id: product.id.clone(), name: product.name.clone() }));
        AddOutcome::Added
    }

    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| &i.product.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { product_id: id.clone() }));
        } else {
            debug!(product_id = %id, "remove for a product not in the cart");
        }
        removed
    }

    /// A quantity of zero removes the line. Unknown ids are ignored.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| &i.product.id == id) {
            item.quantity = quantity;
            self.raise_event(DomainEvent::Cart(CartEvent::QuantityChanged { product_id: id.clone(), quantity }));
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared));
    }

    pub fn total(&self) -> Money { self.items.iter().map(CartItem::line_total).sum() }
    pub fn count(&self) -> u32 { self.items.iter().fold(0u32, |acc, i| acc.saturating_add(i.quantity)) }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
