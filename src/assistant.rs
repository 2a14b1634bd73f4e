//! Boundary to the generative content assistant.
//!
//! The assistant drafts card dedications and product photos. Any failure,
//! including a missing credential, comes back as `None`.
//!
//! Responses can arrive long after the request and after the shopper has
//! typed something else into the same field. [`DraftSequencer`] numbers each
//! request per field so only the newest one may write its result.

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;

/// Prompt inputs for a card dedication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardMessagePrompt {
    pub recipient: String,
    pub occasion: String,
    pub tone: String,
}

pub trait ContentAssistant: Send + Sync {
    /// False when no credential is available; generation controls stay disabled.
    fn is_configured(&self) -> bool { true }

    fn card_message(&self, prompt: &CardMessagePrompt) -> impl Future<Output = Option<String>> + Send;

    /// Returns a `data:` URI for the generated image.
    fn product_image(&self, description: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Used when no assistant credential is configured; generation stays disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineAssistant;

impl ContentAssistant for OfflineAssistant {
    fn is_configured(&self) -> bool { false }
    async fn card_message(&self, _prompt: &CardMessagePrompt) -> Option<String> { None }
    async fn product_image(&self, _description: &str) -> Option<String> { None }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    CardMessage,
    ProductImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DraftTicket {
    pub field: DraftField,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct DraftSequencer {
    latest: HashMap<DraftField, u64>,
    outstanding: HashMap<DraftField, u64>,
    next_seq: u64,
}

impl DraftSequencer {
    pub fn begin(&mut self, field: DraftField) -> DraftTicket {
        let seq = self.bump(field);
        self.outstanding.insert(field, seq);
        DraftTicket { field, seq }
    }

    /// The field was edited by hand; any in-flight response for it is now stale.
    pub fn supersede(&mut self, field: DraftField) {
        self.bump(field);
        self.outstanding.remove(&field);
    }

    /// Closes the ticket. True only if it is still the newest for its field.
    pub fn accept(&mut self, ticket: DraftTicket) -> bool {
        let current = self.latest.get(&ticket.field) == Some(&ticket.seq);
        if self.outstanding.get(&ticket.field) == Some(&ticket.seq) {
            self.outstanding.remove(&ticket.field);
        }
        current
    }

    /// The request was dropped before it settled. Frees the field if this ticket still holds it.
    pub fn abandon(&mut self, ticket: DraftTicket) {
        if self.outstanding.get(&ticket.field) == Some(&ticket.seq) {
            self.outstanding.remove(&ticket.field);
        }
    }

    pub fn is_pending(&self, field: DraftField) -> bool { self.outstanding.contains_key(&field) }

    fn bump(&mut self, field: DraftField) -> u64 {
        self.next_seq += 1;
        self.latest.insert(field, self.next_seq);
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let mut seq = DraftSequencer::default();
        let first = seq.begin(DraftField::CardMessage);
        let second = seq.begin(DraftField::CardMessage);
        assert!(seq.is_pending(DraftField::CardMessage));
        assert!(!seq.accept(first));
        assert!(seq.is_pending(DraftField::CardMessage));
        assert!(seq.accept(second));
        assert!(!seq.is_pending(DraftField::CardMessage));
    }

    #[test]
    fn test_manual_edit_supersedes_in_flight_request() {
        let mut seq = DraftSequencer::default();
        let ticket = seq.begin(DraftField::CardMessage);
        seq.supersede(DraftField::CardMessage);
        assert!(!seq.is_pending(DraftField::CardMessage));
        assert!(!seq.accept(ticket));
    }

    #[test]
    fn test_fields_are_independent() {
        let mut seq = DraftSequencer::default();
        let card = seq.begin(DraftField::CardMessage);
        let image = seq.begin(DraftField::ProductImage);
        assert!(seq.accept(card));
        assert!(seq.accept(image));
    }

    #[test]
    fn test_abandon_frees_field_but_not_for_a_newer_request() {
        let mut seq = DraftSequencer::default();
        let dropped = seq.begin(DraftField::ProductImage);
        seq.abandon(dropped);
        assert!(!seq.is_pending(DraftField::ProductImage));

        let stale = seq.begin(DraftField::ProductImage);
        let fresh = seq.begin(DraftField::ProductImage);
        seq.abandon(stale);
        assert!(seq.is_pending(DraftField::ProductImage));
        assert!(seq.accept(fresh));
    }

    #[tokio::test]
    async fn test_offline_assistant_yields_nothing() {
        assert!(!OfflineAssistant.is_configured());
        let prompt = CardMessagePrompt { recipient: "María".into(), occasion: "Amor".into(), tone: "Poético".into() };
        assert!(OfflineAssistant.card_message(&prompt).await.is_none());
        assert!(OfflineAssistant.product_image("rosas blancas").await.is_none());
    }
}
