//! Storage seams for the fulfillment services.
//!
//! Services talk to [`FulfillmentStore`] and [`CartRepository`] rather than to
//! `PgPool` directly. [`postgres`] is the production implementation;
//! [`memory`] keeps the same guarantees behind a mutex and backs the router
//! tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use stockroom_core::{
    Cart, FeasibilityResult, LineRequest, OrderId, OrderReceipt, OrderStatus,
    OrderView, PaymentMethod, Product, ProductId, Quantity, Recipient, StockLevel, UserId,
};

use crate::db::RepositoryError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A validated order ready to be committed against the ledger.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub lines: Vec<LineRequest>,
    pub recipient: Recipient,
    pub payment_method: PaymentMethod,
}

/// Result of the all-or-nothing commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every line was decremented and the order exists.
    Committed(OrderReceipt),
    /// Nothing was written. Carries the feasibility of the offending lines,
    /// read under the same locks that rejected them.
    Rejected(Vec<FeasibilityResult>),
}

/// Result of a stock restoration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restoration {
    /// Lines were added back to the ledger.
    Restored { lines: Vec<(ProductId, Quantity)> },
    /// An earlier attempt already restored this order.
    AlreadyRestored,
    /// Paid orders keep their stock.
    OrderPaid,
    OrderNotFound,
    /// The order has no lines; nothing was written.
    NoLines,
}

/// Result of recording a successful payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRecord {
    Marked,
    AlreadyPaid,
    /// The order was compensated before the payment arrived.
    StockAlreadyRestored,
    OrderNotFound,
}

/// Ledger, order and catalog operations.
///
/// Implementations must make `commit_order` and `restore_stock` atomic: either
/// every product row changes or none does.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Unlocked snapshot of ledger counters. Unknown ids are omitted.
    async fn stock_levels(&self, ids: &[ProductId]) -> Result<Vec<StockLevel>, RepositoryError>;

    /// Re-validate and decrement every line, then record the order.
    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, RepositoryError>;

    /// Add an order's lines back to the ledger at most once.
    ///
    /// `reason` is appended to the history before `StockRestored`.
    async fn restore_stock(
        &self,
        order_id: OrderId,
        reason: Option<OrderStatus>,
    ) -> Result<Restoration, RepositoryError>;

    async fn mark_paid(&self, order_id: OrderId) -> Result<PaymentRecord, RepositoryError>;

    async fn order(&self, order_id: OrderId) -> Result<Option<OrderView>, RepositoryError>;
}

/// Per-user server cart.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart with display data joined from the catalog.
    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Insert or replace one line.
    ///
    /// # Errors
    ///
    /// `RepositoryError::UnknownProducts` when the product does not exist.
    async fn upsert(&self, user_id: UserId, line: LineRequest) -> Result<(), RepositoryError>;

    /// Remove one line. Returns whether a line existed.
    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError>;

    /// Upsert every line in one transaction and return the resulting cart.
    ///
    /// # Errors
    ///
    /// `RepositoryError::UnknownProducts` when any product does not exist; the
    /// cart is then left unchanged.
    async fn merge(&self, user_id: UserId, lines: &[LineRequest]) -> Result<Cart, RepositoryError>;
}

