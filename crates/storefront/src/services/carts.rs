//! Server cart operations and local cart synchronization.
//!
//! A cart line is a wish, never a reservation: nothing here touches the
//! ledger. Upserts replace the stored quantity, so replaying a sync is
//! harmless.

use std::collections::HashSet;

use tracing::instrument;

use stockroom_core::{Cart, LineRequest, MAX_ORDER_LINES, ProductId, UserId};

use super::FulfillmentError;
use crate::store::CartRepository;

/// Per-user server cart.
pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository) -> Self {
        Self { carts }
    }

    /// # Errors
    ///
    /// Returns `FulfillmentError::Repository` if the cart cannot be read.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, FulfillmentError> {
        Ok(self.carts.get(user_id).await?)
    }

    /// Set the quantity of one line, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::UnknownProducts` if the product does not exist.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %line.product_id))]
    pub async fn upsert(&self, user_id: UserId, line: LineRequest) -> Result<(), FulfillmentError> {
        self.carts.upsert(user_id, line).await?;
        Ok(())
    }

    /// Remove one line. Removing an absent line is not an error.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::Repository` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, FulfillmentError> {
        Ok(self.carts.delete(user_id, product_id).await?)
    }

    /// Merge a local cart into the server cart.
    ///
    /// Each local line replaces the server quantity for its product; server
    /// lines absent locally are kept. The batch applies atomically.
    ///
    /// # Errors
    ///
    /// Data-shaped rejections (`DuplicateProduct`, `TooManyLines`,
    /// `UnknownProducts`) tell the client its local cart is unusable.
    #[instrument(skip(self, lines), fields(user_id = %user_id, lines = lines.len()))]
    pub async fn synchronize(
        &self,
        user_id: UserId,
        lines: &[LineRequest],
    ) -> Result<Cart, FulfillmentError> {
        if lines.len() > MAX_ORDER_LINES {
            return Err(FulfillmentError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }
        let mut seen = HashSet::with_capacity(lines.len());
        if let Some(dup) = lines.iter().find(|l| !seen.insert(l.product_id)) {
            return Err(FulfillmentError::DuplicateProduct(dup.product_id));
        }

        let cart = self.carts.merge(user_id, lines).await?;
        tracing::info!(cart_lines = cart.len(), "Local cart synchronized");
        Ok(cart)
    }
}
