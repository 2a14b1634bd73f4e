//! Local JSON API over the storefront state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::assistant::{ContentAssistant, DraftField, DraftTicket};
use crate::domain::aggregates::{CheckoutStep, DedicationDraft, NewOffer, NewProduct, OrderSummary};
use crate::notifications::{Alert, Notification};
use crate::{CartItem, DeliveryDetails, Money, Offer, OfferId, Product, ProductId, ShopError, Storefront};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub struct AppState<A> {
    pub shop: Arc<Mutex<Storefront>>,
    pub assistant: Arc<A>,
}

impl<A> AppState<A> {
    pub fn new(shop: Storefront, assistant: A) -> Self { Self { shop: Arc::new(Mutex::new(shop)), assistant: Arc::new(assistant) } }
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self { Self { shop: Arc::clone(&self.shop), assistant: Arc::clone(&self.assistant) } }
}

pub fn router<A: ContentAssistant + 'static>(state: AppState<A>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "palo-rosa"})) }))
        .route("/api/v1/products", get(list_products::<A>).post(create_product::<A>))
        .route("/api/v1/products/reset", post(reset_products::<A>))
        .route("/api/v1/products/:id", put(update_product::<A>).delete(delete_product::<A>))
        .route("/api/v1/studio/image", get(get_image_draft::<A>).post(generate_image::<A>).put(put_image_draft::<A>))
        .route("/api/v1/offers", get(list_offers::<A>).post(create_offer::<A>))
        .route("/api/v1/offers/:id", axum::routing::delete(delete_offer::<A>))
        .route("/api/v1/cart", get(get_cart::<A>))
        .route("/api/v1/cart/items", post(add_to_cart::<A>))
        .route("/api/v1/cart/items/:id", put(update_cart_item::<A>).delete(remove_cart_item::<A>))
        .route("/api/v1/checkout", get(get_checkout::<A>))
        .route("/api/v1/checkout/details", put(put_details::<A>))
        .route("/api/v1/checkout/dedication", put(put_dedication::<A>))
        .route("/api/v1/checkout/card-message", post(draft_card_message::<A>))
        .route("/api/v1/checkout/continue", post(continue_checkout::<A>))
        .route("/api/v1/checkout/back", post(back_checkout::<A>))
        .route("/api/v1/checkout/submit", post(submit_order::<A>))
        .route("/api/v1/checkout/close", post(close_checkout::<A>))
        .route("/api/v1/notifications", get(list_notifications::<A>))
        .route("/api/v1/notifications/:id", axum::routing::delete(dismiss_notification::<A>))
        .route("/api/v1/alerts", get(take_alerts::<A>))
        .route("/api/v1/admin/login", post(login::<A>))
        .route("/api/v1/admin/logout", post(logout::<A>))
        .route("/api/v1/admin/password", put(change_password::<A>))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: ShopError) -> (StatusCode, String) {
    let status = match &e {
        ShopError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ShopError::Checkout(_) => StatusCode::CONFLICT,
        ShopError::Assistant(_) => StatusCode::BAD_GATEWAY,
        ShopError::Unauthorized => StatusCode::UNAUTHORIZED,
    };
    (status, e.to_string())
}

fn require_admin(shop: &Storefront) -> Result<(), (StatusCode, String)> {
    if shop.is_admin() { Ok(()) } else { Err(reject(ShopError::Unauthorized)) }
}

/// Held across the assistant call. If the handler is dropped first the ticket is released.
struct InFlight {
    shop: Arc<Mutex<Storefront>>,
    ticket: Option<DraftTicket>,
}

impl InFlight {
    fn new(shop: &Arc<Mutex<Storefront>>, ticket: DraftTicket) -> Self { Self { shop: Arc::clone(shop), ticket: Some(ticket) } }
    fn settle(mut self) { self.ticket = None; }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else { return };
        match self.shop.try_lock() {
            Ok(mut shop) => shop.abandon_draft(ticket),
            Err(_) => {
                let shop = Arc::clone(&self.shop);
                tokio::spawn(async move { shop.lock().await.abandon_draft(ticket) });
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Catalog and offers
// -----------------------------------------------------------------------------

async fn list_products<A>(State(s): State<AppState<A>>) -> Json<Vec<Product>> {
    Json(s.shop.lock().await.products().to_vec())
}

async fn create_product<A>(State(s): State<AppState<A>>, Json(r): Json<NewProduct>) -> Result<(StatusCode, Json<Product>), (StatusCode, String)> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    let product = shop.add_product(r).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)] pub struct UpdateProductRequest { pub name: String, #[serde(default)] pub description: String, pub price: Money, pub image: String, pub category: crate::Category }

async fn update_product<A>(State(s): State<AppState<A>>, Path(id): Path<String>, Json(r): Json<UpdateProductRequest>) -> ApiResult<serde_json::Value> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    let matched = shop.update_product(Product { id: ProductId::new(id), name: r.name, description: r.description, price: r.price, image: r.image, category: r.category });
    Ok(Json(serde_json::json!({"matched": matched})))
}

async fn delete_product<A>(State(s): State<AppState<A>>, Path(id): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    shop.delete_product(&ProductId::new(id));
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_products<A>(State(s): State<AppState<A>>) -> ApiResult<Vec<Product>> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    shop.reset_catalog();
    Ok(Json(shop.products().to_vec()))
}

#[derive(Debug, Deserialize)] pub struct ImageRequest { pub description: String }

async fn get_image_draft<A>(State(s): State<AppState<A>>) -> ApiResult<serde_json::Value> {
    let shop = s.shop.lock().await;
    require_admin(&shop)?;
    Ok(Json(serde_json::json!({"image": shop.product_image_draft(), "generating": shop.is_generating(DraftField::ProductImage)})))
}

#[derive(Debug, Deserialize)] pub struct ImageDraftRequest { pub image: Option<String> }

async fn put_image_draft<A>(State(s): State<AppState<A>>, Json(r): Json<ImageDraftRequest>) -> Result<StatusCode, (StatusCode, String)> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    shop.set_product_image(r.image);
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_image<A: ContentAssistant>(State(s): State<AppState<A>>, Json(r): Json<ImageRequest>) -> ApiResult<serde_json::Value> {
    let (ticket, description) = {
        let mut shop = s.shop.lock().await;
        require_admin(&shop)?;
        if !s.assistant.is_configured() {
            return Err(reject(ShopError::Assistant("no assistant configured".to_string())));
        }
        shop.begin_product_image(&r.description)
            .ok_or((StatusCode::CONFLICT, "image generation unavailable".to_string()))?
    };
    let in_flight = InFlight::new(&s.shop, ticket);
    let image = s.assistant.product_image(&description).await;
    in_flight.settle();
    let image = s.shop.lock().await.complete_product_image(ticket, image).map_err(reject)?;
    Ok(Json(serde_json::json!({"image": image})))
}

async fn list_offers<A>(State(s): State<AppState<A>>) -> Json<Vec<Offer>> {
    Json(s.shop.lock().await.offers().to_vec())
}

async fn create_offer<A>(State(s): State<AppState<A>>, Json(r): Json<NewOffer>) -> Result<(StatusCode, Json<Offer>), (StatusCode, String)> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    let offer = shop.add_offer(r).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(offer)))
}

async fn delete_offer<A>(State(s): State<AppState<A>>, Path(id): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    let mut shop = s.shop.lock().await;
    require_admin(&shop)?;
    shop.delete_offer(&OfferId::new(id));
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------------
// Cart
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CartView { pub items: Vec<CartItem>, pub total: Money, pub count: u32 }

fn cart_view(shop: &Storefront) -> CartView {
    CartView { items: shop.cart().to_vec(), total: shop.cart_total(), count: shop.cart_count() }
}

async fn get_cart<A>(State(s): State<AppState<A>>) -> Json<CartView> {
    Json(cart_view(&*s.shop.lock().await))
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct AddToCartRequest { pub product_id: ProductId }

async fn add_to_cart<A>(State(s): State<AppState<A>>, Json(r): Json<AddToCartRequest>) -> ApiResult<CartView> {
    let mut shop = s.shop.lock().await;
    shop.add_to_cart_by_id(&r.product_id).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    Ok(Json(cart_view(&shop)))
}

#[derive(Debug, Deserialize)] pub struct QuantityRequest { pub quantity: u32 }

async fn update_cart_item<A>(State(s): State<AppState<A>>, Path(id): Path<String>, Json(r): Json<QuantityRequest>) -> Json<CartView> {
    let mut shop = s.shop.lock().await;
    shop.update_quantity(&ProductId::new(id), r.quantity);
    Json(cart_view(&shop))
}

async fn remove_cart_item<A>(State(s): State<AppState<A>>, Path(id): Path<String>) -> Json<CartView> {
    let mut shop = s.shop.lock().await;
    shop.remove_from_cart(&ProductId::new(id));
    Json(cart_view(&shop))
}

// -----------------------------------------------------------------------------
// Checkout
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub step: CheckoutStep,
    pub step_number: u8,
    pub details: DeliveryDetails,
    pub dedication: DedicationDraft,
    pub generating: bool,
    pub can_generate: bool,
    pub total: Money,
}

fn checkout_view(shop: &Storefront, assistant_ready: bool) -> CheckoutView {
    let wizard = shop.checkout();
    CheckoutView {
        step: wizard.step(),
        step_number: wizard.step().number(),
        details: wizard.details().clone(),
        dedication: wizard.dedication().clone(),
        generating: shop.is_generating(DraftField::CardMessage),
        can_generate: assistant_ready && shop.can_generate_card_message(),
        total: shop.cart_total(),
    }
}

async fn get_checkout<A: ContentAssistant>(State(s): State<AppState<A>>) -> Json<CheckoutView> {
    Json(checkout_view(&*s.shop.lock().await, s.assistant.is_configured()))
}

async fn put_details<A: ContentAssistant>(State(s): State<AppState<A>>, Json(r): Json<DeliveryDetails>) -> Json<CheckoutView> {
    let mut shop = s.shop.lock().await;
    shop.set_delivery_details(r);
    Json(checkout_view(&shop, s.assistant.is_configured()))
}

async fn put_dedication<A: ContentAssistant>(State(s): State<AppState<A>>, Json(r): Json<DedicationDraft>) -> Json<CheckoutView> {
    let mut shop = s.shop.lock().await;
    shop.set_dedication(r);
    Json(checkout_view(&shop, s.assistant.is_configured()))
}

/// The lock is released while the assistant works so the shopper can keep editing.
async fn draft_card_message<A: ContentAssistant>(State(s): State<AppState<A>>) -> ApiResult<CheckoutView> {
    if !s.assistant.is_configured() {
        return Err(reject(ShopError::Assistant("no assistant configured".to_string())));
    }
    let (ticket, prompt) = s.shop.lock().await.begin_card_message()
        .ok_or((StatusCode::CONFLICT, "card message generation unavailable".to_string()))?;
    let in_flight = InFlight::new(&s.shop, ticket);
    let reply = s.assistant.card_message(&prompt).await;
    in_flight.settle();
    let mut shop = s.shop.lock().await;
    shop.complete_card_message(ticket, reply);
    Ok(Json(checkout_view(&shop, s.assistant.is_configured())))
}

async fn continue_checkout<A: ContentAssistant>(State(s): State<AppState<A>>) -> ApiResult<CheckoutView> {
    let mut shop = s.shop.lock().await;
    shop.continue_checkout().map_err(reject)?;
    Ok(Json(checkout_view(&shop, s.assistant.is_configured())))
}

async fn back_checkout<A: ContentAssistant>(State(s): State<AppState<A>>) -> ApiResult<CheckoutView> {
    let mut shop = s.shop.lock().await;
    shop.back_checkout().map_err(reject)?;
    Ok(Json(checkout_view(&shop, s.assistant.is_configured())))
}

async fn submit_order<A>(State(s): State<AppState<A>>) -> ApiResult<OrderSummary> {
    s.shop.lock().await.submit_order().map(Json).map_err(reject)
}

async fn close_checkout<A: ContentAssistant>(State(s): State<AppState<A>>) -> Json<CheckoutView> {
    let mut shop = s.shop.lock().await;
    shop.close_checkout();
    Json(checkout_view(&shop, s.assistant.is_configured()))
}

// -----------------------------------------------------------------------------
// Notifications, alerts, admin
// -----------------------------------------------------------------------------

async fn list_notifications<A>(State(s): State<AppState<A>>) -> Json<Vec<Notification>> {
    Json(s.shop.lock().await.notifications())
}

async fn dismiss_notification<A>(State(s): State<AppState<A>>, Path(id): Path<String>) -> StatusCode {
    s.shop.lock().await.dismiss_notification(&id);
    StatusCode::NO_CONTENT
}

async fn take_alerts<A>(State(s): State<AppState<A>>) -> Json<Vec<Alert>> {
    Json(s.shop.lock().await.take_alerts())
}

#[derive(Debug, Deserialize)] pub struct PasswordRequest { pub password: String }

async fn login<A>(State(s): State<AppState<A>>, Json(r): Json<PasswordRequest>) -> (StatusCode, Json<serde_json::Value>) {
    let ok = s.shop.lock().await.login(&r.password);
    let status = if ok { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
    (status, Json(serde_json::json!({"authenticated": ok})))
}

async fn logout<A>(State(s): State<AppState<A>>) -> StatusCode {
    s.shop.lock().await.logout();
    StatusCode::NO_CONTENT
}

async fn change_password<A>(State(s): State<AppState<A>>, Json(r): Json<PasswordRequest>) -> Result<StatusCode, (StatusCode, String)> {
    s.shop.lock().await.change_password(&r.password).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::{CardMessagePrompt, OfflineAssistant};
    use crate::store::PersistedStore;
    use crate::storefront::StorefrontOptions;

    struct Poet;
    impl ContentAssistant for Poet {
        async fn card_message(&self, prompt: &CardMessagePrompt) -> Option<String> { Some(format!("Para {}, con amor", prompt.recipient)) }
        async fn product_image(&self, _description: &str) -> Option<String> { None }
    }

    fn app<A: ContentAssistant + 'static>(assistant: A) -> Router {
        router(AppState::new(Storefront::hydrate(PersistedStore::in_memory(), StorefrontOptions::default()), assistant))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(OfflineAssistant), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cart_flow() {
        let app = app(OfflineAssistant);
        send(&app, "POST", "/api/v1/cart/items", Some(json!({"productId": "1"}))).await;
        send(&app, "POST", "/api/v1/cart/items", Some(json!({"productId": "1"}))).await;
        let (_, cart) = send(&app, "POST", "/api/v1/cart/items", Some(json!({"productId": "4"}))).await;
        assert_eq!(cart["count"], 3);
        assert_eq!(cart["total"], 230_000);

        let (status, _) = send(&app, "POST", "/api/v1/cart/items", Some(json!({"productId": "zzz"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, cart) = send(&app, "PUT", "/api/v1/cart/items/1", Some(json!({"quantity": 0}))).await;
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart["total"], 60_000);

        let (_, notes) = send(&app, "GET", "/api/v1/notifications", None).await;
        assert_eq!(notes.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_admin_routes_require_login() {
        let app = app(OfflineAssistant);
        let (status, _) = send(&app, "DELETE", "/api/v1/products/1", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, "POST", "/api/v1/admin/login", Some(json!({"password": "nope"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["authenticated"], false);
        let (_, alerts) = send(&app, "GET", "/api/v1/alerts", None).await;
        assert_eq!(alerts.as_array().unwrap().len(), 1);

        send(&app, "POST", "/api/v1/admin/login", Some(json!({"password": "Karol25"}))).await;
        let (status, created) = send(&app, "POST", "/api/v1/products", Some(json!({"name": "Lirios", "price": 55000, "image": "img", "category": "flowers"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/api/v1/products", Some(json!({"name": "", "price": 0, "image": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, products) = send(&app, "GET", "/api/v1/products", None).await;
        assert_eq!(products[0]["id"], created["id"]);
        assert_eq!(products.as_array().unwrap().len(), 7);
    }

    struct Stalled;
    impl ContentAssistant for Stalled {
        async fn card_message(&self, _prompt: &CardMessagePrompt) -> Option<String> { std::future::pending().await }
        async fn product_image(&self, _description: &str) -> Option<String> { std::future::pending().await }
    }

    #[tokio::test]
    async fn test_disconnected_generation_does_not_block_the_field() {
        let app = app(Stalled);
        let wait = std::time::Duration::from_millis(100);
        send(&app, "POST", "/api/v1/admin/login", Some(json!({"password": "Karol25"}))).await;

        let gone = tokio::time::timeout(wait, send(&app, "POST", "/api/v1/studio/image", Some(json!({"description": "rosas"})))).await;
        assert!(gone.is_err());
        let (_, draft) = send(&app, "GET", "/api/v1/studio/image", None).await;
        assert_eq!(draft["generating"], false);
        let retry = tokio::time::timeout(wait, send(&app, "POST", "/api/v1/studio/image", Some(json!({"description": "rosas"})))).await;
        assert!(retry.is_err());

        send(&app, "PUT", "/api/v1/checkout/dedication", Some(json!({"recipient": "Marta"}))).await;
        send(&app, "POST", "/api/v1/checkout/continue", None).await;
        let gone = tokio::time::timeout(wait, send(&app, "POST", "/api/v1/checkout/card-message", None)).await;
        assert!(gone.is_err());
        let (_, view) = send(&app, "GET", "/api/v1/checkout", None).await;
        assert_eq!(view["generating"], false);
        assert_eq!(view["canGenerate"], true);
    }

    #[tokio::test]
    async fn test_offline_assistant_disables_generation() {
        let app = app(OfflineAssistant);
        send(&app, "PUT", "/api/v1/checkout/dedication", Some(json!({"recipient": "Marta"}))).await;
        let (_, view) = send(&app, "POST", "/api/v1/checkout/continue", None).await;
        assert_eq!(view["canGenerate"], false);
        let (status, _) = send(&app, "POST", "/api/v1/checkout/card-message", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_manual_image_fills_blank_product_image() {
        let app = app(OfflineAssistant);
        send(&app, "POST", "/api/v1/admin/login", Some(json!({"password": "Karol25"}))).await;
        let (status, _) = send(&app, "PUT", "/api/v1/studio/image", Some(json!({"image": "https://example.com/lirios.jpg"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, created) = send(&app, "POST", "/api/v1/products", Some(json!({"name": "Lirios", "price": 55000}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["image"], "https://example.com/lirios.jpg");
        let (_, draft) = send(&app, "GET", "/api/v1/studio/image", None).await;
        assert!(draft["image"].is_null());
    }

    #[tokio::test]
    async fn test_checkout_flow_with_card_message() {
        let app = app(Poet);
        let (_, view) = send(&app, "POST", "/api/v1/checkout/card-message", None).await;
        assert!(view.is_null());

        send(&app, "PUT", "/api/v1/checkout/dedication", Some(json!({"recipient": "Lucía", "occasion": "Aniversario", "tone": "Formal"}))).await;
        let (_, view) = send(&app, "POST", "/api/v1/checkout/continue", None).await;
        assert_eq!(view["stepNumber"], 2);
        let (status, view) = send(&app, "POST", "/api/v1/checkout/card-message", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["details"]["cardMessage"], "Para Lucía, con amor");

        let (status, _) = send(&app, "POST", "/api/v1/checkout/submit", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        send(&app, "POST", "/api/v1/checkout/continue", None).await;
        let (status, order) = send(&app, "POST", "/api/v1/checkout/submit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["delivery"]["cardMessage"], "Para Lucía, con amor");
        let (_, view) = send(&app, "GET", "/api/v1/checkout", None).await;
        assert_eq!(view["step"], "review");
    }
}
