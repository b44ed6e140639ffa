//! `PostgreSQL`-backed stores, delegating to the repositories in [`crate::db`].

use async_trait::async_trait;
use sqlx::PgPool;

use stockroom_core::{
    Cart, LineRequest, OrderId, OrderStatus, OrderView, Product, ProductId, StockLevel, UserId,
};

use super::{CartRepository, CommitOutcome, FulfillmentStore, NewOrder, PaymentRecord, Restoration};
use crate::db::{CartLineRepository, OrderRepository, ProductRepository, RepositoryError};

/// Production store over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FulfillmentStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get(id).await
    }

    async fn stock_levels(&self, ids: &[ProductId]) -> Result<Vec<StockLevel>, RepositoryError> {
        ProductRepository::new(&self.pool).stock_levels(ids).await
    }

    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, RepositoryError> {
        OrderRepository::new(&self.pool).commit(order).await
    }

    async fn restore_stock(
        &self,
        order_id: OrderId,
        reason: Option<OrderStatus>,
    ) -> Result<Restoration, RepositoryError> {
        OrderRepository::new(&self.pool).restore(order_id, reason).await
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<PaymentRecord, RepositoryError> {
        OrderRepository::new(&self.pool).mark_paid(order_id).await
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<OrderView>, RepositoryError> {
        OrderRepository::new(&self.pool).get(order_id).await
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        CartLineRepository::new(&self.pool).get(user_id).await
    }

    async fn upsert(&self, user_id: UserId, line: LineRequest) -> Result<(), RepositoryError> {
        CartLineRepository::new(&self.pool).upsert(user_id, line).await
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        CartLineRepository::new(&self.pool).delete(user_id, product_id).await
    }

    async fn merge(&self, user_id: UserId, lines: &[LineRequest]) -> Result<Cart, RepositoryError> {
        CartLineRepository::new(&self.pool).merge(user_id, lines).await
    }
}
