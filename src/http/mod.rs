//! HTTP surface: routing, shared state, and cart-identity resolution.
//!
//! Authentication happens upstream; this layer only reads the resolved
//! identity headers (`x-user-id` from the auth proxy, `x-session-id` from
//! the storefront for guests) and never issues or verifies tokens itself.

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::PricingConfig;
use crate::domain::cart::CartOwner;
use crate::error::{AppError, Result};

pub mod cart;
pub mod catalog;
pub mod orders;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pricing: PricingConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/v1/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/api/v1/products/:id/variants", post(catalog::add_variant))
        .route("/api/v1/variants/:id", put(catalog::update_variant))
        .route("/api/v1/designs", get(catalog::list_designs).post(catalog::create_design))
        .route("/api/v1/designs/grouped", get(catalog::grouped_designs))
        .route(
            "/api/v1/designs/:id",
            get(catalog::get_design)
                .put(catalog::update_design)
                .delete(catalog::delete_design),
        )
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route(
            "/api/v1/cart/items/:id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/v1/cart/merge", post(cart::merge_guest_cart))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/v1/orders/my", get(orders::my_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "stitchwear" }))
}

/// Resolve the cart owner for a request: a user id when the auth proxy set
/// one, otherwise the guest session id.
pub(crate) fn cart_owner(headers: &HeaderMap) -> Result<CartOwner> {
    if let Some(user_id) = user_id(headers)? {
        return Ok(CartOwner::User(user_id));
    }
    if let Some(session_id) = session_id(headers) {
        return Ok(CartOwner::Session(session_id));
    }
    Err(AppError::invalid("missing x-user-id or x-session-id header"))
}

pub(crate) fn user_id(headers: &HeaderMap) -> Result<Option<i64>> {
    match headers.get("x-user-id") {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Some)
            .ok_or_else(|| AppError::invalid("invalid x-user-id header")),
        None => Ok(None),
    }
}

pub(crate) fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_header_wins_over_session() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "42".parse().unwrap());
        headers.insert("x-session-id", "abc".parse().unwrap());
        assert_eq!(cart_owner(&headers).unwrap(), CartOwner::User(42));
    }

    #[test]
    fn session_header_alone_gives_guest_owner() {
        let mut headers = HeaderMap::new();
        headers.insert("x-session-id", "abc".parse().unwrap());
        assert_eq!(cart_owner(&headers).unwrap(), CartOwner::Session("abc".into()));
    }

    #[test]
    fn missing_identity_is_invalid() {
        assert!(cart_owner(&HeaderMap::new()).is_err());
    }

    #[test]
    fn garbage_user_id_is_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "not-a-number".parse().unwrap());
        assert!(cart_owner(&headers).is_err());
    }
}
