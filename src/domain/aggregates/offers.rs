//! Offer board

use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::domain::aggregates::CatalogError;
use crate::domain::value_objects::OfferId;
use crate::Offer;

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct NewOffer {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "image is required"))]
    pub image: String,
}

/// Promotional offers. Display only; no link to catalog products.
#[derive(Clone, Debug, Default)]
pub struct OfferBoard {
    offers: Vec<Offer>,
}

impl OfferBoard {
    pub fn new(offers: Vec<Offer>) -> Self { Self { offers } }
    pub fn offers(&self) -> &[Offer] { &self.offers }

    pub fn add(&mut self, draft: NewOffer) -> Result<&Offer, CatalogError> {
        draft.validate().map_err(CatalogError::Invalid)?;
        let offer = Offer { id: OfferId::generate(), title: draft.title, description: draft.description, image: draft.image };
        info!(offer_id = %offer.id, "offer published");
        self.offers.insert(0, offer);
        Ok(&self.offers[0])
    }

    pub fn delete(&mut self, id: &OfferId) -> bool {
        let before = self.offers.len();
        self.offers.retain(|o| &o.id != id);
        self.offers.len() != before
    }
}
