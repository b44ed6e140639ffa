//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests: a real storefront server over `MemoryStore`
//! cargo test -p stockroom-integration-tests
//!
//! # PostgreSQL tests (ignored by default)
//! DATABASE_URL=postgres://localhost/stockroom_test \
//!     cargo test -p stockroom-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Feasibility, order commit and payment callbacks over HTTP
//! - `cart_sync` - Local cart, server cart and login synchronization via the client
//! - `postgres` - Ledger invariants against a real database

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    extract::Path as UrlPath,
    http::StatusCode,
    routing::post,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_sessions::Session;

use stockroom_client::{ClientConfig, StorefrontApi};
use stockroom_core::{
    OrderId, PaymentCallback, PaymentStatus, Price, Product, ProductId, Recipient, UserId,
};
use stockroom_storefront::config::StorefrontConfig;
use stockroom_storefront::db::NewProduct;
use stockroom_storefront::middleware::{clear_current_user, session_layer, set_current_user};
use stockroom_storefront::models::CurrentUser;
use stockroom_storefront::routes;
use stockroom_storefront::services::sign_callback;
use stockroom_storefront::state::AppState;
use stockroom_storefront::store::{FulfillmentStore, MemoryStore};
use stockroom_storefront::with_middleware;

/// Session secret that passes the storefront's strength checks.
pub const SESSION_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6vD1%";

/// Callback secret that passes the storefront's strength checks.
pub const CALLBACK_SECRET: &str = "Zq8#Lm2$Vw7!Rt4@Kp9%Hx3^Jn6&Bc1*Fd5";

/// A storefront listening on a random local port, backed by `MemoryStore`.
///
/// Adds two routes standing in for the identity service:
/// `POST /test/login/{user_id}` and `POST /test/logout`.
pub struct TestApp {
    pub base_url: String,
    pub store: MemoryStore,
    callback_secret: Option<SecretString>,
    server: JoinHandle<()>,
}

async fn login(session: Session, UrlPath(user_id): UrlPath<i32>) -> StatusCode {
    let user = CurrentUser {
        id: UserId::new(user_id),
        email: None,
    };
    match set_current_user(&session, &user).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn logout(session: Session) -> StatusCode {
    match clear_current_user(&session).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl TestApp {
    /// Start a storefront that accepts unsigned payment callbacks.
    pub async fn spawn() -> Self {
        Self::start(None).await
    }

    /// Start a storefront that requires signed payment callbacks.
    pub async fn spawn_with_callback_secret() -> Self {
        Self::start(Some(CALLBACK_SECRET)).await
    }

    async fn start(callback_secret: Option<&str>) -> Self {
        let mut vars = vec![
            ("STOREFRONT_DATABASE_URL", "postgres://unused/stockroom"),
            ("STOREFRONT_BASE_URL", "http://127.0.0.1"),
            ("STOREFRONT_SESSION_SECRET", SESSION_SECRET),
        ];
        if let Some(secret) = callback_secret {
            vars.push(("PAYMENT_CALLBACK_SECRET", secret));
        }
        let config = StorefrontConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
        .unwrap();

        let store = MemoryStore::new();
        let state = AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store.clone()));

        let routes = Router::new()
            .route("/test/login/{user_id}", post(login))
            .route("/test/logout", post(logout))
            .merge(routes::routes());
        let app = with_middleware(
            routes,
            state,
            session_layer(tower_sessions::MemoryStore::default(), false),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            callback_secret: callback_secret.map(SecretString::from),
            server,
        }
    }

    /// Client configuration pointing at this server, with the local cart in `dir`.
    pub fn client_config(&self, dir: &Path) -> ClientConfig {
        ClientConfig::new(&self.base_url)
            .unwrap()
            .with_local_cart_path(dir.join("cart.json"))
    }

    /// A fresh API client with its own cookie jar.
    pub fn api(&self) -> StorefrontApi {
        StorefrontApi::new(&ClientConfig::new(&self.base_url).unwrap()).unwrap()
    }

    /// Sign `api` in as `user_id`.
    pub async fn login(&self, api: &StorefrontApi, user_id: UserId) {
        let response = api
            .http()
            .post(format!("{}/test/login/{user_id}", self.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
    }

    /// Sign `api` out.
    pub async fn logout(&self, api: &StorefrontApi) {
        let response = api
            .http()
            .post(format!("{}/test/logout", self.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
    }

    /// Seed a product.
    pub async fn product(&self, title: &str, stock: i32, max_order: i32) -> Product {
        self.store
            .insert_product(NewProduct {
                title: title.to_string(),
                price: Price::new(Decimal::new(1000, 2)),
                image_url: None,
                quantity_in_stock: stock,
                max_order_quantity: max_order,
            })
            .await
    }

    /// Current stock of a product.
    pub async fn stock(&self, product_id: ProductId) -> i32 {
        self.store
            .product(product_id)
            .await
            .unwrap()
            .unwrap()
            .quantity_in_stock
    }

    /// Post a gateway callback, signed when the server expects signatures.
    ///
    /// Returns the status and the decoded JSON body.
    pub async fn callback(&self, status: PaymentStatus, order_id: OrderId) -> (u16, serde_json::Value) {
        let body = PaymentCallback { status, order_id }.encode().unwrap();
        self.post_callback(body.into_bytes(), true).await
    }

    /// Post a raw callback body, optionally signed.
    pub async fn post_callback(&self, body: Vec<u8>, sign: bool) -> (u16, serde_json::Value) {
        let mut request = reqwest::Client::new()
            .post(format!("{}/api/payments/callback", self.base_url))
            .header("content-type", "text/plain");
        if let (true, Some(secret)) = (sign, &self.callback_secret) {
            request = request.header("x-payment-signature", sign_callback(secret, &body).unwrap());
        }

        let response = request.body(body).send().await.unwrap();
        let status = response.status().as_u16();
        let json = response.json().await.unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A recipient that passes validation.
pub fn recipient() -> Recipient {
    Recipient {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: None,
        address: "12 Analytical Row".to_string(),
    }
}
