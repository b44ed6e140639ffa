//! Advisory feasibility checks.
//!
//! Results are computed from an unlocked snapshot of the ledger and may be
//! stale by the time the shopper checks out; [`super::OrderCommitter`] is the
//! authoritative re-check.

use tracing::instrument;

use stockroom_core::{FeasibilityResult, LineRequest, MAX_ORDER_LINES, ProductId};

use super::FulfillmentError;
use crate::store::FulfillmentStore;

/// Evaluates `(product, quantity)` pairs against current stock levels.
pub struct FeasibilityChecker<'a> {
    store: &'a dyn FulfillmentStore,
}

impl<'a> FeasibilityChecker<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn FulfillmentStore) -> Self {
        Self { store }
    }

    /// One result per requested line, in request order.
    ///
    /// Unknown products yield `ProductNotFound` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::TooManyLines` for oversized requests, or
    /// `FulfillmentError::Repository` if the ledger cannot be read.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn check(
        &self,
        lines: &[LineRequest],
    ) -> Result<Vec<FeasibilityResult>, FulfillmentError> {
        if lines.len() > MAX_ORDER_LINES {
            return Err(FulfillmentError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let levels = self.store.stock_levels(&ids).await?;

        let results: Vec<FeasibilityResult> = lines
            .iter()
            .map(|line| {
                let level = levels.iter().find(|l| l.product_id == line.product_id);
                FeasibilityResult::evaluate(line.product_id, line.quantity, level)
            })
            .collect();

        let rejected = results.iter().filter(|r| !r.can_be_ordered).count();
        if rejected > 0 {
            tracing::debug!(rejected, "Feasibility check found unorderable lines");
        }

        Ok(results)
    }
}
