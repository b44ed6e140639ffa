//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Store reachability
//!
//! # Catalog
//! GET  /api/products/{id}           - Display data and stock counters
//!
//! # Feasibility (advisory)
//! POST /api/feasibility             - Per-line feasibility results
//!
//! # Orders
//! POST /api/orders                  - Commit an order (201 / 409)
//! GET  /api/orders/{id}             - Order, lines and status history
//!
//! # Server cart (requires auth)
//! GET    /api/cart                  - Current cart
//! PUT    /api/cart/lines/{id}       - Set line quantity
//! DELETE /api/cart/lines/{id}       - Remove line
//! POST   /api/cart/sync             - Merge a local cart
//!
//! # Payment gateway
//! POST /api/payments/callback       - Gateway callback (base64 JSON body)
//! ```

pub mod cart;
pub mod feasibility;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the server cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route(
            "/lines/{product_id}",
            put(cart::upsert_line).delete(cart::delete_line),
        )
        .route("/sync", post(cart::sync))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/{order_id}", get(orders::show))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products/{product_id}", get(products::show))
        .route("/feasibility", post(feasibility::check))
        .nest("/orders", order_routes())
        .nest("/cart", cart_routes())
        .route("/payments/callback", post(payments::callback))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use stockroom_core::{Price, Product};

    use super::*;
    use crate::config::StorefrontConfig;
    use crate::db::NewProduct;
    use crate::middleware::session_layer;
    use crate::store::MemoryStore;

    fn config() -> StorefrontConfig {
        StorefrontConfig::from_lookup(|key| {
            match key {
                "STOREFRONT_DATABASE_URL" => Some("postgres://unused/stockroom"),
                "STOREFRONT_BASE_URL" => Some("http://127.0.0.1"),
                "STOREFRONT_SESSION_SECRET" => Some("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6vD1%"),
                _ => None,
            }
            .map(String::from)
        })
        .unwrap()
    }

    fn router(store: &MemoryStore) -> Router {
        let state = AppState::with_stores(config(), Arc::new(store.clone()), Arc::new(store.clone()));
        crate::app(
            state,
            session_layer(tower_sessions::MemoryStore::default(), false),
        )
    }

    async fn mug(store: &MemoryStore) -> Product {
        store
            .insert_product(NewProduct {
                title: "Mug".to_string(),
                price: Price::new(Decimal::new(1200, 2)),
                image_url: None,
                quantity_in_stock: 5,
                max_order_quantity: 3,
            })
            .await
    }

    async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let store = MemoryStore::new();

        let response = router(&store)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(&store)
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_feasibility_reports_missing_product_per_line() {
        let store = MemoryStore::new();
        let a = mug(&store).await;

        let (status, body) = post_json(
            router(&store),
            "/api/feasibility",
            &json!({ "lines": [
                { "product_id": a.id, "quantity": 4 },
                { "product_id": 9999, "quantity": 1 },
            ]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["can_be_ordered"], false);
        assert_eq!(body["results"][0]["reason"]["kind"], "exceeded_max_order_quantity");
        assert_eq!(body["results"][0]["reason"]["limit"], 3);
        assert_eq!(body["results"][1]["reason"]["kind"], "product_not_found");
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected() {
        let store = MemoryStore::new();
        let a = mug(&store).await;

        let (status, _) = post_json(
            router(&store),
            "/api/feasibility",
            &json!({ "lines": [{ "product_id": a.id, "quantity": 0 }] }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_cart_requires_login() {
        let store = MemoryStore::new();
        let response = router(&store)
            .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let response = router(&store)
            .oneshot(Request::get("/api/products/424242").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
