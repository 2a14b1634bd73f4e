//! Checkout Wizard Aggregate
//!
//! Linear three-step flow: review the cart, write the card dedication, then
//! fill in delivery and payment. Submission only happens from the last step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::aggregates::Cart;
use crate::domain::events::{CheckoutEvent, DomainEvent};
use crate::domain::value_objects::Money;
use crate::{CartItem, DeliveryDetails, PaymentMethod};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    #[default]
    Review = 1,
    Dedication = 2,
    Delivery = 3,
}

impl CheckoutStep {
    pub fn number(self) -> u8 { self as u8 }

    fn next(self) -> Option<Self> {
        match self { Self::Review => Some(Self::Dedication), Self::Dedication => Some(Self::Delivery), Self::Delivery => None }
    }

    fn previous(self) -> Option<Self> {
        match self { Self::Review => None, Self::Dedication => Some(Self::Review), Self::Delivery => Some(Self::Dedication) }
    }
}

/// Whether submission empties the cart and whether closing the drawer discards the draft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckoutPolicy {
    pub clear_cart_on_submit: bool,
    pub reset_on_close: bool,
}

/// Inputs for drafting a card message with the assistant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedicationDraft {
    pub recipient: String,
    pub occasion: String,
    pub tone: String,
}

impl Default for DedicationDraft {
    fn default() -> Self {
        Self { recipient: String::new(), occasion: "Cumpleaños".to_string(), tone: "Romántico".to_string() }
    }
}

/// What the shopper confirmed. No payment is taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub lines: Vec<CartItem>,
    pub item_count: u32,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryDetails,
    pub placed_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Text of the confirmation alert shown after submission.
    pub fn confirmation(&self) -> String {
        let follow_up = match self.payment_method {
            PaymentMethod::Cash => "Por favor tener el cambio exacto para facilitar la entrega.".to_string(),
            method => format!("Las instrucciones de pago vía {} han sido enviadas a tu teléfono.", method.label()),
        };
        format!("¡Pedido Realizado!\nTotal: {}\nMétodo: {}\n\n{follow_up}", self.total, self.payment_method.label())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CheckoutWizard {
    step: CheckoutStep,
    details: DeliveryDetails,
    dedication: DedicationDraft,
    policy: CheckoutPolicy,
    events: Vec<DomainEvent>,
}

impl CheckoutWizard {
    pub fn new(policy: CheckoutPolicy) -> Self { Self { policy, ..Self::default() } }

    pub fn step(&self) -> CheckoutStep { self.step }
    pub fn policy(&self) -> CheckoutPolicy { self.policy }
    pub fn details(&self) -> &DeliveryDetails { &self.details }
    pub fn dedication(&self) -> &DedicationDraft { &self.dedication }

    pub fn set_details(&mut self, details: DeliveryDetails) { self.details = details; }
    pub fn set_dedication(&mut self, dedication: DedicationDraft) { self.dedication = dedication; }
    pub fn set_card_message(&mut self, message: Option<String>) { self.details.card_message = message; }

    /// Moves forward one step. No gate on cart contents or dedication text.
    pub fn advance(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let next = self.step.next().ok_or(CheckoutError::AlreadyAtDelivery)?;
        self.step = next;
        self.raise_event(DomainEvent::Checkout(CheckoutEvent::Advanced { step: next.number() }));
        Ok(next)
    }

    pub fn back(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let previous = self.step.previous().ok_or(CheckoutError::AtFirstStep)?;
        self.step = previous;
        self.raise_event(DomainEvent::Checkout(CheckoutEvent::SteppedBack { step: previous.number() }));
        Ok(previous)
    }

    /// Builds the order summary and resets the wizard. The cart is left to the caller.
    pub fn submit(&mut self, cart: &Cart) -> Result<OrderSummary, CheckoutError> {
        if self.step != CheckoutStep::Delivery { return Err(CheckoutError::NotAtDelivery); }
        let delivery = std::mem::take(&mut self.details);
        let summary = OrderSummary {
            lines: cart.items().to_vec(),
            item_count: cart.count(),
            total: cart.total(),
            payment_method: delivery.payment_method,
            delivery,
            placed_at: Utc::now(),
        };
        self.step = CheckoutStep::Review;
        self.dedication = DedicationDraft::default();
        info!(total = %summary.total, items = summary.item_count, payment = summary.payment_method.label(), "order submitted");
        self.raise_event(DomainEvent::Checkout(CheckoutEvent::Submitted { total: summary.total, payment_method: summary.payment_method }));
        Ok(summary)
    }

    /// Drawer closed. Returns whether the draft was discarded.
    pub fn close(&mut self) -> bool {
        let reset = self.policy.reset_on_close;
        if reset { self.reset(); }
        self.raise_event(DomainEvent::Checkout(CheckoutEvent::Closed { reset }));
        reset
    }

    fn reset(&mut self) {
        self.step = CheckoutStep::Review;
        self.details = DeliveryDetails::default();
        self.dedication = DedicationDraft::default();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CheckoutError { AtFirstStep, AlreadyAtDelivery, NotAtDelivery }
impl std::error::Error for CheckoutError {}
impl std::fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtFirstStep => write!(f, "Already at the first step"),
            Self::AlreadyAtDelivery => write!(f, "Already at the delivery step; submit the order instead"),
            Self::NotAtDelivery => write!(f, "Orders can only be submitted from the delivery step"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, Product, ProductId};

    fn filled_details() -> DeliveryDetails {
        DeliveryDetails { name: "Laura".into(), address: "Calle 10 # 4-20".into(), phone: "3112905600".into(), notes: "Portería".into(), payment_method: PaymentMethod::Cash, card_message: Some("Feliz día".into()) }
    }

    fn cart_with(price: u64, qty: u32) -> Cart {
        let mut cart = Cart::default();
        let p = Product { id: ProductId::new("1"), name: "Ramo".into(), description: String::new(), price: Money::new(price), image: "img".into(), category: Category::Flowers };
        for _ in 0..qty { cart.add(&p); }
        cart
    }

    #[test]
    fn test_forward_and_back_preserve_details() {
        let mut wizard = CheckoutWizard::default();
        wizard.set_details(filled_details());
        assert_eq!(wizard.advance().unwrap(), CheckoutStep::Dedication);
        assert_eq!(wizard.back().unwrap(), CheckoutStep::Review);
        assert_eq!(wizard.details(), &filled_details());
    }

    #[test]
    fn test_step_bounds() {
        let mut wizard = CheckoutWizard::default();
        assert_eq!(wizard.back(), Err(CheckoutError::AtFirstStep));
        wizard.advance().unwrap();
        wizard.advance().unwrap();
        assert_eq!(wizard.step().number(), 3);
        assert_eq!(wizard.advance(), Err(CheckoutError::AlreadyAtDelivery));
    }

    #[test]
    fn test_submit_only_from_delivery() {
        let mut wizard = CheckoutWizard::default();
        let cart = cart_with(50_000, 2);
        assert_eq!(wizard.submit(&cart), Err(CheckoutError::NotAtDelivery));
        wizard.advance().unwrap();
        wizard.advance().unwrap();
        wizard.set_details(filled_details());
        let summary = wizard.submit(&cart).unwrap();
        assert_eq!(summary.total, Money::new(100_000));
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.payment_method, PaymentMethod::Cash);
        assert_eq!(summary.delivery, filled_details());
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert_eq!(wizard.details(), &DeliveryDetails::default());
        assert!(summary.confirmation().contains("$100.000"));
    }

    #[test]
    fn test_empty_cart_still_submits() {
        let mut wizard = CheckoutWizard::default();
        wizard.advance().unwrap();
        wizard.advance().unwrap();
        let summary = wizard.submit(&Cart::default()).unwrap();
        assert_eq!(summary.total, Money::ZERO);
    }

    #[test]
    fn test_close_keeps_draft_by_default() {
        let mut wizard = CheckoutWizard::default();
        wizard.set_details(filled_details());
        wizard.advance().unwrap();
        assert!(!wizard.close());
        assert_eq!(wizard.step(), CheckoutStep::Dedication);
        assert_eq!(wizard.details(), &filled_details());
    }

    #[test]
    fn test_close_resets_when_configured() {
        let mut wizard = CheckoutWizard::new(CheckoutPolicy { reset_on_close: true, ..Default::default() });
        wizard.set_details(filled_details());
        wizard.advance().unwrap();
        assert!(wizard.close());
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert_eq!(wizard.details(), &DeliveryDetails::default());
    }
}
