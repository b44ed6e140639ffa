//! HTTP client for the storefront JSON API.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_core::{
    Cart, CreateOrderRequest, FeasibilityResult, LineRequest, OrderId, OrderReceipt, OrderView,
    Product, ProductId, Quantity,
};

use crate::{ClientConfig, ClientError, ClientResult};

#[derive(Serialize)]
struct LinesBody<'a> {
    lines: &'a [LineRequest],
}

#[derive(Serialize)]
struct QuantityBody {
    quantity: Quantity,
}

#[derive(Deserialize)]
struct FeasibilityBody {
    results: Vec<FeasibilityResult>,
}

/// Storefront API over one `reqwest` client.
///
/// The client keeps a cookie store, so once the identity service has signed
/// the shopper in on this client every cart call runs as that shopper.
/// Cloning is cheap and shares the cookie store.
#[derive(Debug, Clone)]
pub struct StorefrontApi {
    client: Client,
    base_url: String,
}

impl StorefrontApi {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the TLS backend cannot be initialised.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// Use an existing client, e.g. one already carrying a login cookie.
    #[must_use]
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// The underlying `reqwest` client.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.client
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.client.request(method, url)
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await?;
        Err(ClientError::from_response(status, &text))
    }

    // ========== Catalog ==========

    /// GET /api/products/{id}
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for unknown products.
    pub async fn product(&self, product_id: ProductId) -> ClientResult<Product> {
        let response = self
            .request(Method::GET, &format!("api/products/{product_id}"))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========== Feasibility ==========

    /// POST /api/feasibility
    ///
    /// Results come back in request order, one per line.
    ///
    /// # Errors
    ///
    /// Returns a transport or server error; infeasible lines are not errors.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn check_feasibility(&self, lines: &[LineRequest]) -> ClientResult<Vec<FeasibilityResult>> {
        let response = self
            .request(Method::POST, "api/feasibility")
            .json(&LinesBody { lines })
            .send()
            .await?;
        let body: FeasibilityBody = Self::handle_response(response).await?;
        Ok(body.results)
    }

    // ========== Orders ==========

    /// POST /api/orders
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CommitViolation` when stock moved since the last
    /// check; the caller should re-run feasibility and prompt the shopper.
    #[instrument(skip(self, order), fields(lines = order.lines.len()))]
    pub async fn create_order(&self, order: &CreateOrderRequest) -> ClientResult<OrderReceipt> {
        let response = self
            .request(Method::POST, "api/orders")
            .json(order)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// GET /api/orders/{id}
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for unknown or foreign orders.
    pub async fn order(&self, order_id: OrderId) -> ClientResult<OrderView> {
        let response = self
            .request(Method::GET, &format!("api/orders/{order_id}"))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========== Server cart ==========

    /// GET /api/cart
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when not signed in.
    pub async fn cart(&self) -> ClientResult<Cart> {
        let response = self.request(Method::GET, "api/cart").send().await?;
        Self::handle_response(response).await
    }

    /// PUT /api/cart/lines/{id}
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` for unknown products.
    pub async fn upsert_cart_line(&self, product_id: ProductId, quantity: Quantity) -> ClientResult<()> {
        let response = self
            .request(Method::PUT, &format!("api/cart/lines/{product_id}"))
            .json(&QuantityBody { quantity })
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// DELETE /api/cart/lines/{id}
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when not signed in.
    pub async fn delete_cart_line(&self, product_id: ProductId) -> ClientResult<()> {
        let response = self
            .request(Method::DELETE, &format!("api/cart/lines/{product_id}"))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// POST /api/cart/sync
    ///
    /// Merges `lines` into the server cart, replacing quantities per product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rejected` if the server refuses the lines.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn sync_cart(&self, lines: &[LineRequest]) -> ClientResult<Cart> {
        let response = self
            .request(Method::POST, "api/cart/sync")
            .json(&LinesBody { lines })
            .send()
            .await?;
        Self::handle_response(response).await
    }
}
