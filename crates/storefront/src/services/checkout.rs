//! Order commit.
//!
//! The only place stock is decremented. A request is validated structurally,
//! then handed to the store which re-evaluates every line under row locks and
//! decrements all of them or none.

use tracing::instrument;

use stockroom_core::{CreateOrderRequest, OrderReceipt, UserId};

use super::FulfillmentError;
use crate::store::{CommitOutcome, FulfillmentStore, NewOrder};

/// Turns a checkout request into an order.
pub struct OrderCommitter<'a> {
    store: &'a dyn FulfillmentStore,
}

impl<'a> OrderCommitter<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn FulfillmentStore) -> Self {
        Self { store }
    }

    /// Commit an order for `user_id` (or an anonymous shopper).
    ///
    /// Commit violations are never retried here; the caller re-runs
    /// feasibility and asks the shopper to adjust.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::InvalidOrder` for empty, oversized or duplicate
    ///   lines and invalid recipients.
    /// - `FulfillmentError::CommitViolation` with fresh results for the
    ///   offending lines; nothing was written.
    /// - `FulfillmentError::Repository` on infrastructure failure; the
    ///   transaction was rolled back.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn commit(
        &self,
        user_id: Option<UserId>,
        request: CreateOrderRequest,
    ) -> Result<OrderReceipt, FulfillmentError> {
        request.validate()?;

        let order = NewOrder {
            user_id,
            lines: request.lines,
            recipient: request.recipient,
            payment_method: request.payment_method,
        };

        match self.store.commit_order(&order).await? {
            CommitOutcome::Committed(receipt) => {
                tracing::info!(
                    order_id = %receipt.order_id,
                    total = %receipt.total,
                    payment_method = ?order.payment_method,
                    "Order committed"
                );
                Ok(receipt)
            }
            CommitOutcome::Rejected(results) => {
                tracing::info!(
                    products = ?results.iter().map(|r| r.product_id).collect::<Vec<_>>(),
                    "Order rejected at commit"
                );
                Err(FulfillmentError::CommitViolation(results))
            }
        }
    }
}
