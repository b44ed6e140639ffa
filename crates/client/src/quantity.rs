//! Debounced quantity edits for one cart line.

use std::time::Duration;

use tokio::sync::mpsc;

use stockroom_core::{LineRequest, ProductId, Quantity};

use crate::Debouncer;

/// Turns rapid quantity edits into few cart upserts.
///
/// Emitted lines arrive on the receiver from [`QuantityEditor::new`]; the
/// owner applies them to the active cart and reports success through
/// [`QuantityEditor::committed`].
pub struct QuantityEditor {
    product_id: ProductId,
    committed: Quantity,
    debouncer: Debouncer<LineRequest>,
}

impl QuantityEditor {
    /// Start editing a line whose cart quantity is `committed`.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        committed: Quantity,
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<LineRequest>) {
        let (debouncer, rx) = Debouncer::new(window);
        let editor = Self {
            product_id,
            committed,
            debouncer,
        };
        (editor, rx)
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Quantity the cart last accepted.
    #[must_use]
    pub const fn committed_quantity(&self) -> Quantity {
        self.committed
    }

    /// Record a new desired quantity.
    ///
    /// Going back to the committed quantity cancels whatever is pending
    /// instead of sending a redundant upsert. Returns whether an upsert was
    /// scheduled.
    pub fn edit(&mut self, quantity: Quantity) -> bool {
        if quantity == self.committed {
            self.debouncer.cancel();
            return false;
        }
        self.debouncer.schedule(LineRequest {
            product_id: self.product_id,
            quantity,
        });
        true
    }

    /// The cart accepted `quantity`.
    pub const fn committed(&mut self, quantity: Quantity) {
        self.committed = quantity;
    }

    /// Drop any pending edit, e.g. when the line leaves the screen.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}
