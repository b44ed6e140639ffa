//! Client-side feasibility display state.
//!
//! Checks are advisory and may come back after the shopper changed the
//! quantity again. A result is only shown while it still answers the
//! quantity the shopper currently wants.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use stockroom_core::{FeasibilityResult, LineRequest, ProductId, Quantity};

use crate::{ClientResult, StorefrontApi};

/// Desired quantities and the results that still match them.
#[derive(Debug, Default)]
pub struct FeasibilityView {
    desired: HashMap<ProductId, Quantity>,
    results: HashMap<ProductId, FeasibilityResult>,
}

impl FeasibilityView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the quantity the shopper now wants. A result for another
    /// quantity is dropped.
    pub fn desire(&mut self, product_id: ProductId, quantity: Quantity) {
        self.desired.insert(product_id, quantity);
        if self
            .results
            .get(&product_id)
            .is_some_and(|r| r.quantity != quantity)
        {
            self.results.remove(&product_id);
        }
    }

    /// Stop tracking a product, e.g. after it left the cart.
    pub fn forget(&mut self, product_id: ProductId) {
        self.desired.remove(&product_id);
        self.results.remove(&product_id);
    }

    /// Store `result` if it answers the current desired quantity.
    ///
    /// Returns `false` for stale results, which are discarded.
    pub fn apply(&mut self, result: FeasibilityResult) -> bool {
        if self.desired.get(&result.product_id) != Some(&result.quantity) {
            tracing::debug!(
                product_id = %result.product_id,
                quantity = %result.quantity,
                "Discarding stale feasibility result"
            );
            return false;
        }
        self.results.insert(result.product_id, result);
        true
    }

    /// The current result for `product_id`, if one matches.
    #[must_use]
    pub fn result(&self, product_id: ProductId) -> Option<&FeasibilityResult> {
        self.results.get(&product_id)
    }

    /// Lines to check: every desired quantity without a matching result.
    #[must_use]
    pub fn unchecked(&self) -> Vec<LineRequest> {
        let mut lines: Vec<LineRequest> = self
            .desired
            .iter()
            .filter(|(id, _)| !self.results.contains_key(id))
            .map(|(&product_id, &quantity)| LineRequest {
                product_id,
                quantity,
            })
            .collect();
        lines.sort_by_key(|l| l.product_id);
        lines
    }

    /// Whether every desired line has a matching, orderable result.
    #[must_use]
    pub fn all_orderable(&self) -> bool {
        self.desired.keys().all(|id| {
            self.results
                .get(id)
                .is_some_and(|r| r.can_be_ordered)
        })
    }
}

/// Runs feasibility checks for one screen and applies their results.
///
/// Closing the tracker cancels outstanding checks; their results are never
/// applied.
#[derive(Debug)]
pub struct FeasibilityTracker {
    api: StorefrontApi,
    view: Mutex<FeasibilityView>,
    cancel: CancellationToken,
}

impl FeasibilityTracker {
    #[must_use]
    pub fn new(api: StorefrontApi) -> Self {
        Self {
            api,
            view: Mutex::new(FeasibilityView::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Record a desired quantity.
    pub async fn desire(&self, product_id: ProductId, quantity: Quantity) {
        self.view.lock().await.desire(product_id, quantity);
    }

    pub async fn forget(&self, product_id: ProductId) {
        self.view.lock().await.forget(product_id);
    }

    /// Current result for a product.
    pub async fn result(&self, product_id: ProductId) -> Option<FeasibilityResult> {
        self.view.lock().await.result(product_id).copied()
    }

    pub async fn all_orderable(&self) -> bool {
        self.view.lock().await.all_orderable()
    }

    /// Check every desired line that has no matching result yet.
    ///
    /// Returns how many results were applied; results for quantities that
    /// changed while the request was in flight are dropped.
    ///
    /// # Errors
    ///
    /// Returns transport and server errors from the check.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> ClientResult<usize> {
        let lines = self.view.lock().await.unchecked();
        if lines.is_empty() {
            return Ok(0);
        }

        let results = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(0),
            results = self.api.check_feasibility(&lines) => results?,
        };

        if self.cancel.is_cancelled() {
            return Ok(0);
        }
        let mut view = self.view.lock().await;
        Ok(results.into_iter().filter(|r| view.apply(*r)).count())
    }

    /// Cancel outstanding and future checks.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stockroom_core::StockLevel;

    use super::*;

    fn qty(n: i32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn result(product: i32, quantity: i32) -> FeasibilityResult {
        let level = StockLevel {
            product_id: ProductId::new(product),
            quantity_in_stock: 5,
            max_order_quantity: 3,
        };
        FeasibilityResult::evaluate(ProductId::new(product), qty(quantity), Some(&level))
    }

    #[test]
    fn test_result_for_current_quantity_is_applied() {
        let mut view = FeasibilityView::new();
        view.desire(ProductId::new(1), qty(3));

        assert!(view.apply(result(1, 3)));
        assert!(view.result(ProductId::new(1)).unwrap().can_be_ordered);
        assert!(view.all_orderable());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut view = FeasibilityView::new();
        view.desire(ProductId::new(1), qty(3));
        view.desire(ProductId::new(1), qty(4));

        assert!(!view.apply(result(1, 3)));
        assert!(view.result(ProductId::new(1)).is_none());

        assert!(view.apply(result(1, 4)));
        assert!(!view.all_orderable());
    }

    #[test]
    fn test_new_desire_drops_outdated_result() {
        let mut view = FeasibilityView::new();
        view.desire(ProductId::new(1), qty(2));
        view.apply(result(1, 2));

        view.desire(ProductId::new(1), qty(4));
        assert!(view.result(ProductId::new(1)).is_none());
        assert_eq!(view.unchecked().len(), 1);
    }

    #[test]
    fn test_result_for_untracked_product_is_discarded() {
        let mut view = FeasibilityView::new();
        assert!(!view.apply(result(7, 1)));

        view.desire(ProductId::new(7), qty(1));
        view.forget(ProductId::new(7));
        assert!(!view.apply(result(7, 1)));
    }

    #[test]
    fn test_unchecked_lists_only_missing_results() {
        let mut view = FeasibilityView::new();
        view.desire(ProductId::new(2), qty(1));
        view.desire(ProductId::new(1), qty(1));
        view.apply(result(2, 1));

        let lines = view.unchecked();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().unwrap().product_id, ProductId::new(1));
    }
}
