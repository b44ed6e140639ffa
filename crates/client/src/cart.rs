//! One narrow cart interface with a local and a server implementation.
//!
//! Which one is active is decided by the caller from the authentication
//! state (see [`crate::ShopSession::cart`]); neither knows about the other.

use async_trait::async_trait;

use stockroom_core::{Cart, CartLine, ProductId};

use crate::{ClientResult, LocalCart, StorefrontApi};

/// Wish-list operations shared by both cart kinds.
///
/// `upsert` replaces the quantity for the line's product; it never adds.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Current contents.
    async fn get(&self) -> ClientResult<Cart>;

    /// Insert or replace one line.
    async fn upsert(&self, line: CartLine) -> ClientResult<()>;

    /// Remove one line. Removing an absent line is not an error.
    async fn delete(&self, product_id: ProductId) -> ClientResult<()>;
}

#[async_trait]
impl CartStore for LocalCart {
    async fn get(&self) -> ClientResult<Cart> {
        Ok(self.snapshot().await)
    }

    async fn upsert(&self, line: CartLine) -> ClientResult<()> {
        Self::upsert(self, line).await
    }

    async fn delete(&self, product_id: ProductId) -> ClientResult<()> {
        self.remove(product_id).await?;
        Ok(())
    }
}

/// The signed-in shopper's cart, held by the storefront.
///
/// Display snapshots are not sent; the storefront joins them from the catalog.
#[derive(Debug, Clone)]
pub struct ServerCart {
    api: StorefrontApi,
}

impl ServerCart {
    #[must_use]
    pub const fn new(api: StorefrontApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CartStore for ServerCart {
    async fn get(&self) -> ClientResult<Cart> {
        self.api.cart().await
    }

    async fn upsert(&self, line: CartLine) -> ClientResult<()> {
        self.api.upsert_cart_line(line.product_id, line.quantity).await
    }

    async fn delete(&self, product_id: ProductId) -> ClientResult<()> {
        self.api.delete_cart_line(product_id).await
    }
}
