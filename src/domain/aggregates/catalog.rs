//! Catalog Aggregate

use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::domain::events::{CatalogEvent, DomainEvent};
use crate::domain::value_objects::{Money, ProductId};
use crate::{Category, Product};

/// Admin form input for a new product. The id is generated on [`Catalog::add`].
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, message = "price must be positive"))]
    pub price: u64,
    #[validate(length(min = 1, message = "image is required"))]
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: Category,
}

impl NewProduct {
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.image = self.image.trim().to_string();
        self
    }
}

#[derive(Clone, Debug)]
pub struct Catalog {
    products: Vec<Product>,
    events: Vec<DomainEvent>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self { Self { products, events: vec![] } }
    pub fn seeded() -> Self { Self::new(seed_products()) }

    pub fn products(&self) -> &[Product] { &self.products }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }
    pub fn find(&self, id: &ProductId) -> Option<&Product> { self.products.iter().find(|p| &p.id == id) }

    /// Validates the draft, assigns a fresh id and puts the product first.
    pub fn add(&mut self, draft: NewProduct) -> Result<&Product, CatalogError> {
        let draft = draft.normalized();
        draft.validate().map_err(CatalogError::Invalid)?;
        let product = Product {
            id: ProductId::generate(),
            name: draft.name,
            description: draft.description,
            price: Money::new(draft.price),
            image: draft.image,
            category: draft.category,
        };
        info!(product_id = %product.id, name = %product.name, "product added");
        self.raise_event(DomainEvent::Catalog(CatalogEvent::ProductAdded { product_id: product.id.clone(), name: product.name.clone() }));
        self.products.insert(0, product);
        Ok(&self.products[0])
    }

    pub fn update(&mut self, product: Product) -> bool {
        let product_id = product.id.clone();
        let matched = match self.products.iter_mut().find(|p| p.id == product_id) {
            Some(existing) => { *existing = product; true }
            None => false,
        };
        info!(%product_id, matched, "product updated");
        self.raise_event(DomainEvent::Catalog(CatalogEvent::ProductUpdated { product_id, matched }));
        matched
    }

    pub fn delete(&mut self, id: &ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| &p.id != id);
        let matched = self.products.len() != before;
        info!(product_id = %id, matched, "product deleted");
        self.raise_event(DomainEvent::Catalog(CatalogEvent::ProductDeleted { product_id: id.clone(), matched }));
        matched
    }

    pub fn reset(&mut self) {
        self.products = seed_products();
        info!("catalog reset to seed list");
        self.raise_event(DomainEvent::Catalog(CatalogEvent::Reset));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

impl Default for Catalog {
    fn default() -> Self { Self::seeded() }
}

/// The built-in catalog the shop opens with and restores on reset.
pub fn seed_products() -> Vec<Product> {
    let seed = |id: &str, name: &str, description: &str, price: u64, image: &str, category| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        price: Money::new(price),
        image: format!("https://images.unsplash.com/{image}?auto=format&fit=crop&q=80&w=400"),
        category,
    };
    vec![
        seed("1", "Ramo Rosa Eterna", "Un arreglo clásico de rosas rojo profundo, perfecto para expresar un amor apasionado.", 85_000, "photo-1562690868-60bbe7293e94", Category::Flowers),
        seed("2", "Orquídea Phalaenopsis", "Elegante orquídea blanca en maceta de cerámica. Un símbolo de pureza y elegancia.", 120_000, "photo-1566938064504-a6ec270fb759", Category::Plants),
        seed("3", "Mezcla Sky Garden", "Una mezcla vibrante de flores de temporada inspirada en los colores del Sky Garden de Londres.", 95_000, "photo-1526047932273-341f2a7631f9", Category::Flowers),
        seed("4", "Girasoles Radiantes", "Girasoles brillantes y alegres envueltos en papel rústico.", 60_000, "photo-1470509037663-253afd7f0f51", Category::Flowers),
        seed("5", "Armonía Rosa", "Rosas rosas suaves y lirios. Delicado y sentimental.", 90_000, "photo-1582794543139-8ac92a9ab4d9", Category::Flowers),
        seed("6", "Trío de Suculentas", "Tres suculentas de bajo mantenimiento en macetas geométricas.", 45_000, "photo-1459411552884-841db9b3cc2a", Category::Plants),
    ]
}

#[derive(Debug, Clone)] pub enum CatalogError { Invalid(ValidationErrors) }
impl std::error::Error for CatalogError {}
impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::Invalid(errors) => write!(f, "{errors}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, price: u64, image: &str) -> NewProduct {
        NewProduct { name: name.into(), description: "d".into(), price, image: image.into(), category: Category::Gifts }
    }

    #[test]
    fn test_add_prepends_with_fresh_id() {
        let mut catalog = Catalog::seeded();
        let id = catalog.add(draft("Caja de Rosas", 150_000, "data:image/jpeg;base64,AAA")).unwrap().id.clone();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.products()[0].id, id);
        assert!(seed_products().iter().all(|p| p.id != id));
        assert!(matches!(catalog.take_events().as_slice(), [DomainEvent::Catalog(CatalogEvent::ProductAdded { .. })]));
    }

    #[test]
    fn test_add_rejects_missing_fields_without_change() {
        let mut catalog = Catalog::seeded();
        assert!(catalog.add(draft("   ", 10, "img")).is_err());
        assert!(catalog.add(draft("Rosa", 0, "img")).is_err());
        assert!(catalog.add(draft("Rosa", 10, "")).is_err());
        assert_eq!(catalog.products(), seed_products().as_slice());
        assert!(catalog.take_events().is_empty());
    }

    #[test]
    fn test_update_replaces_or_silently_ignores() {
        let mut catalog = Catalog::seeded();
        let mut edited = catalog.products()[1].clone();
        edited.price = Money::new(130_000);
        assert!(catalog.update(edited.clone()));
        assert_eq!(catalog.find(&edited.id), Some(&edited));

        let mut ghost = edited;
        ghost.id = ProductId::new("missing");
        let before = catalog.products().to_vec();
        assert!(!catalog.update(ghost));
        assert_eq!(catalog.products(), before.as_slice());
        assert_eq!(catalog.take_events().len(), 2);
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let mut catalog = Catalog::seeded();
        assert!(!catalog.delete(&ProductId::new("nope")));
        assert_eq!(catalog.products(), seed_products().as_slice());
        assert!(catalog.delete(&ProductId::new("4")));
        assert!(catalog.find(&ProductId::new("4")).is_none());
        assert_eq!(catalog.take_events().len(), 2);
    }

    #[test]
    fn test_reset_restores_seed() {
        let mut catalog = Catalog::new(vec![]);
        catalog.reset();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.take_events(), vec![DomainEvent::Catalog(CatalogEvent::Reset)]);
    }
}
