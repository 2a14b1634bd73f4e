//! Application state container.
//!
//! Owns every aggregate plus the persisted mirror. State is hydrated from the
//! store once; after that the in-memory copy is authoritative and each
//! mutation writes its collection straight back.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::admin::AdminGate;
use crate::assistant::{CardMessagePrompt, ContentAssistant, DraftField, DraftSequencer, DraftTicket};
use crate::config::{AppConfig, DEFAULT_ADMIN_PASSWORD};
use crate::domain::aggregates::{
    AddOutcome, Cart, Catalog, CheckoutPolicy, CheckoutStep, CheckoutWizard, DedicationDraft, NewOffer, NewProduct, OfferBoard,
    OrderSummary, seed_products,
};
use crate::domain::events::{CartEvent, CatalogEvent, DomainEvent};
use crate::notifications::{Alert, Notification, NotificationKind, NotificationQueue, DEFAULT_NOTIFICATION_TTL};
use crate::store::{PersistedStore, ADMIN_PASSWORD_KEY, CART_KEY, OFFERS_KEY, PRODUCTS_KEY};
use crate::{CartItem, DeliveryDetails, Money, Offer, OfferId, Product, ProductId, Result, ShopError};

const MISSING_PRODUCT_FIELDS: &str = "Completa todos los datos y la imagen antes de publicar.";
const MISSING_OFFER_FIELDS: &str = "Completa el título y la imagen de la oferta.";
const WRONG_PASSWORD: &str = "Contraseña incorrecta";
const EMPTY_PASSWORD: &str = "La contraseña no puede estar vacía";
const PASSWORD_CHANGED: &str = "Contraseña actualizada con éxito";
const IMAGE_FAILED: &str = "No se pudo generar la imagen. Verifica tu conexión o API Key.";

#[derive(Clone, Debug)]
pub struct StorefrontOptions {
    pub default_admin_password: String,
    pub notification_ttl: Duration,
    pub checkout: CheckoutPolicy,
}

impl Default for StorefrontOptions {
    fn default() -> Self {
        Self { default_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(), notification_ttl: DEFAULT_NOTIFICATION_TTL, checkout: CheckoutPolicy::default() }
    }
}

impl From<&AppConfig> for StorefrontOptions {
    fn from(config: &AppConfig) -> Self {
        Self { default_admin_password: config.default_admin_password.clone(), notification_ttl: config.notification_ttl, checkout: config.checkout }
    }
}

#[derive(Debug)]
pub struct Storefront {
    store: PersistedStore,
    catalog: Catalog,
    offers: OfferBoard,
    cart: Cart,
    checkout: CheckoutWizard,
    admin: AdminGate,
    notifications: NotificationQueue,
    alerts: Vec<Alert>,
    drafts: DraftSequencer,
    product_image_draft: Option<String>,
}

impl Storefront {
    pub fn hydrate(store: PersistedStore, options: StorefrontOptions) -> Self {
        let catalog = Catalog::new(store.load(PRODUCTS_KEY, seed_products()));
        let offers = OfferBoard::new(store.load(OFFERS_KEY, Vec::new()));
        let cart = Cart::from_items(store.load(CART_KEY, Vec::new()));
        let admin = AdminGate::new(store.load_text(ADMIN_PASSWORD_KEY, &options.default_admin_password));
        info!(products = catalog.len(), offers = offers.offers().len(), cart_lines = cart.items().len(), "storefront hydrated");

        let storefront = Self {
            store,
            catalog,
            offers,
            cart,
            checkout: CheckoutWizard::new(options.checkout),
            admin,
            notifications: NotificationQueue::new(options.notification_ttl),
            alerts: vec![],
            drafts: DraftSequencer::default(),
            product_image_draft: None,
        };
        storefront.persist_products();
        storefront.persist_offers();
        storefront.persist_cart();
        storefront.persist_password();
        storefront
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub fn products(&self) -> &[Product] { self.catalog.products() }
    pub fn product(&self, id: &ProductId) -> Option<&Product> { self.catalog.find(id) }

    /// A blank image falls back to the pending generated image, if any.
    pub fn add_product(&mut self, mut draft: NewProduct) -> Result<Product> {
        if draft.image.trim().is_empty() {
            if let Some(image) = &self.product_image_draft { draft.image = image.clone(); }
        }
        let product = match self.catalog.add(draft) {
            Ok(product) => product.clone(),
            Err(e) => {
                self.alert(MISSING_PRODUCT_FIELDS);
                return Err(e.into());
            }
        };
        self.product_image_draft = None;
        self.persist_products();
        self.drain_events();
        Ok(product)
    }

    pub fn update_product(&mut self, product: Product) -> bool {
        let matched = self.catalog.update(product);
        self.persist_products();
        self.drain_events();
        matched
    }

    pub fn delete_product(&mut self, id: &ProductId) -> bool {
        let matched = self.catalog.delete(id);
        self.persist_products();
        self.drain_events();
        matched
    }

    pub fn reset_catalog(&mut self) {
        self.catalog.reset();
        self.persist_products();
        self.drain_events();
    }

    // -------------------------------------------------------------------------
    // Offers
    // -------------------------------------------------------------------------

    pub fn offers(&self) -> &[Offer] { self.offers.offers() }

    pub fn add_offer(&mut self, draft: NewOffer) -> Result<Offer> {
        let offer = match self.offers.add(draft) {
            Ok(offer) => offer.clone(),
            Err(e) => {
                self.alert(MISSING_OFFER_FIELDS);
                return Err(e.into());
            }
        };
        self.persist_offers();
        Ok(offer)
    }

    pub fn delete_offer(&mut self, id: &OfferId) -> bool {
        let removed = self.offers.delete(id);
        self.persist_offers();
        removed
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    pub fn cart(&self) -> &[CartItem] { self.cart.items() }
    pub fn cart_total(&self) -> Money { self.cart.total() }
    pub fn cart_count(&self) -> u32 { self.cart.count() }

    pub fn add_to_cart(&mut self, product: &Product) -> AddOutcome {
        let outcome = self.cart.add(product);
        self.persist_cart();
        self.drain_events();
        outcome
    }

    /// Adds the catalog product with this id. `None` if the catalog has no such product.
    pub fn add_to_cart_by_id(&mut self, id: &ProductId) -> Option<AddOutcome> {
        let product = self.catalog.find(id)?.clone();
        Some(self.add_to_cart(&product))
    }

    pub fn remove_from_cart(&mut self, id: &ProductId) {
        self.cart.remove(id);
        self.persist_cart();
        self.drain_events();
    }

    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) {
        self.cart.update_quantity(id, quantity);
        self.persist_cart();
        self.drain_events();
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    pub fn checkout(&self) -> &CheckoutWizard { &self.checkout }

    pub fn continue_checkout(&mut self) -> Result<CheckoutStep> {
        let step = self.checkout.advance()?;
        self.drain_events();
        Ok(step)
    }

    pub fn back_checkout(&mut self) -> Result<CheckoutStep> {
        let step = self.checkout.back()?;
        self.drain_events();
        Ok(step)
    }

    pub fn set_delivery_details(&mut self, details: DeliveryDetails) {
        if details.card_message != self.checkout.details().card_message {
            self.drafts.supersede(DraftField::CardMessage);
        }
        self.checkout.set_details(details);
    }

    pub fn set_dedication(&mut self, dedication: DedicationDraft) { self.checkout.set_dedication(dedication); }

    /// Hand-typed card message. Wins over any draft still in flight.
    pub fn set_card_message(&mut self, message: impl Into<String>) {
        self.drafts.supersede(DraftField::CardMessage);
        self.checkout.set_card_message(Some(message.into()));
    }

    /// Confirms the order from the delivery step and queues the confirmation alert.
    pub fn submit_order(&mut self) -> Result<OrderSummary> {
        let summary = self.checkout.submit(&self.cart)?;
        self.drafts.supersede(DraftField::CardMessage);
        self.alert(summary.confirmation());
        if self.checkout.policy().clear_cart_on_submit {
            self.cart.clear();
            self.persist_cart();
        }
        self.drain_events();
        Ok(summary)
    }

    pub fn close_checkout(&mut self) {
        if self.checkout.close() {
            self.drafts.supersede(DraftField::CardMessage);
        }
        self.drain_events();
    }

    pub fn is_generating(&self, field: DraftField) -> bool { self.drafts.is_pending(field) }

    pub fn can_generate_card_message(&self) -> bool {
        self.checkout.step() == CheckoutStep::Dedication
            && !self.checkout.dedication().recipient.trim().is_empty()
            && !self.drafts.is_pending(DraftField::CardMessage)
    }

    /// Starts a card message draft. `None` while generation is disabled.
    pub fn begin_card_message(&mut self) -> Option<(DraftTicket, CardMessagePrompt)> {
        if !self.can_generate_card_message() { return None; }
        let dedication = self.checkout.dedication();
        let prompt = CardMessagePrompt { recipient: dedication.recipient.trim().to_string(), occasion: dedication.occasion.clone(), tone: dedication.tone.clone() };
        Some((self.drafts.begin(DraftField::CardMessage), prompt))
    }

    /// Applies an assistant reply if it is still the newest request. Returns whether the field changed.
    pub fn complete_card_message(&mut self, ticket: DraftTicket, reply: Option<String>) -> bool {
        if !self.drafts.accept(ticket) {
            warn!(seq = ticket.seq, "dropping stale card message draft");
            return false;
        }
        match reply {
            Some(message) => { self.checkout.set_card_message(Some(message)); true }
            None => false,
        }
    }

    pub async fn generate_card_message<A: ContentAssistant>(&mut self, assistant: &A) -> bool {
        if !assistant.is_configured() { return false; }
        let Some((ticket, prompt)) = self.begin_card_message() else { return false };
        let pending = PendingDraft { drafts: &mut self.drafts, ticket: Some(ticket) };
        let reply = assistant.card_message(&prompt).await;
        pending.settle();
        self.complete_card_message(ticket, reply)
    }

    /// Releases a ticket whose request was dropped before the assistant answered.
    pub fn abandon_draft(&mut self, ticket: DraftTicket) {
        warn!(seq = ticket.seq, field = ?ticket.field, "assistant request abandoned");
        self.drafts.abandon(ticket);
    }

    // -------------------------------------------------------------------------
    // Admin
    // -------------------------------------------------------------------------

    pub fn is_admin(&self) -> bool { self.admin.is_authenticated() }

    pub fn login(&mut self, attempt: &str) -> bool {
        let ok = self.admin.login(attempt);
        if ok { info!("admin logged in"); } else { warn!("admin login rejected"); self.alert(WRONG_PASSWORD); }
        ok
    }

    pub fn logout(&mut self) { self.admin.logout(); }

    pub fn change_password(&mut self, new_password: &str) -> Result<()> {
        if !self.admin.is_authenticated() { return Err(ShopError::Unauthorized); }
        if !self.admin.change_password(new_password) {
            self.alert(EMPTY_PASSWORD);
            return Err(ShopError::Validation(EMPTY_PASSWORD.to_string()));
        }
        self.persist_password();
        self.alert(PASSWORD_CHANGED);
        Ok(())
    }

    pub fn product_image_draft(&self) -> Option<&str> { self.product_image_draft.as_deref() }

    /// Image picked by hand for the next product. Wins over any generation still in flight.
    pub fn set_product_image(&mut self, image: Option<String>) {
        self.drafts.supersede(DraftField::ProductImage);
        self.product_image_draft = image.filter(|i| !i.trim().is_empty());
    }

    pub fn begin_product_image(&mut self, description: &str) -> Option<(DraftTicket, String)> {
        let description = description.trim();
        if description.is_empty() || self.drafts.is_pending(DraftField::ProductImage) { return None; }
        Some((self.drafts.begin(DraftField::ProductImage), description.to_string()))
    }

    /// Stores a generated image as the pending new-product image.
    pub fn complete_product_image(&mut self, ticket: DraftTicket, image: Option<String>) -> Result<String> {
        if !self.drafts.accept(ticket) {
            warn!(seq = ticket.seq, "dropping stale product image draft");
            return Err(ShopError::Assistant("superseded by a newer request".to_string()));
        }
        match image {
            Some(image) => {
                self.product_image_draft = Some(image.clone());
                Ok(image)
            }
            None => {
                self.alert(IMAGE_FAILED);
                Err(ShopError::Assistant("no image returned".to_string()))
            }
        }
    }

    pub async fn generate_product_image<A: ContentAssistant>(&mut self, assistant: &A, description: &str) -> Result<String> {
        if !assistant.is_configured() {
            self.alert(IMAGE_FAILED);
            return Err(ShopError::Assistant("no assistant configured".to_string()));
        }
        let (ticket, description) = self
            .begin_product_image(description)
            .ok_or_else(|| ShopError::Validation("describe the arrangement first".to_string()))?;
        let pending = PendingDraft { drafts: &mut self.drafts, ticket: Some(ticket) };
        let image = assistant.product_image(&description).await;
        pending.settle();
        self.complete_product_image(ticket, image)
    }

    // -------------------------------------------------------------------------
    // Notifications and alerts
    // -------------------------------------------------------------------------

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) -> String { self.notifications.push(message, kind) }

    pub fn notifications(&mut self) -> Vec<Notification> { self.notifications.visible(Instant::now()).to_vec() }

    pub fn dismiss_notification(&mut self, id: &str) -> bool { self.notifications.remove(id) }

    pub fn take_alerts(&mut self) -> Vec<Alert> { std::mem::take(&mut self.alerts) }

    fn alert(&mut self, message: impl Into<String>) { self.alerts.push(Alert::new(message)); }

    fn drain_events(&mut self) {
        let events: Vec<DomainEvent> = self
            .catalog
            .take_events()
            .into_iter()
            .chain(self.cart.take_events())
            .chain(self.checkout.take_events())
            .collect();
        for event in events {
            if let Some((message, kind)) = notice_for(&event) {
                self.notifications.push(message, kind);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Write-through
    // -------------------------------------------------------------------------

    fn persist_products(&self) { self.store.save(PRODUCTS_KEY, self.catalog.products()); }
    fn persist_offers(&self) { self.store.save(OFFERS_KEY, self.offers.offers()); }
    fn persist_cart(&self) { self.store.save(CART_KEY, self.cart.items()); }
    fn persist_password(&self) { self.store.save_text(ADMIN_PASSWORD_KEY, self.admin.password()); }
}

/// Frees its field if dropped while the assistant call is still pending.
struct PendingDraft<'a> {
    drafts: &'a mut DraftSequencer,
    ticket: Option<DraftTicket>,
}

impl PendingDraft<'_> {
    fn settle(mut self) { self.ticket = None; }
}

impl Drop for PendingDraft<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() { self.drafts.abandon(ticket); }
    }
}

/// Toast shown for an event, if any.
fn notice_for(event: &DomainEvent) -> Option<(String, NotificationKind)> {
    let notice = match event {
        DomainEvent::Catalog(CatalogEvent::ProductAdded { .. }) => ("¡Nuevo producto en tienda! 🌸".to_string(), NotificationKind::Success),
        DomainEvent::Catalog(CatalogEvent::ProductUpdated { .. }) => ("Actualizado correctamente".to_string(), NotificationKind::Success),
        DomainEvent::Catalog(CatalogEvent::ProductDeleted { .. }) => ("Producto removido del catálogo".to_string(), NotificationKind::Info),
        DomainEvent::Catalog(CatalogEvent::Reset) => ("Catálogo restaurado".to_string(), NotificationKind::Info),
        DomainEvent::Cart(CartEvent::ItemAdded { name, .. }) => (format!("\"{name}\" agregado ✨"), NotificationKind::Success),
        DomainEvent::Cart(CartEvent::QuantityIncremented { .. }) => ("Agregamos otro a la cesta 🌹".to_string(), NotificationKind::Info),
        _ => return None,
    };
    Some(notice)
}
