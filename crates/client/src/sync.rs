//! Merge of the local cart into the server cart at login.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use stockroom_core::Cart;

use crate::{ClientResult, LocalCart, StorefrontApi};

/// How a synchronization ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server merged the local lines; its resulting cart is returned.
    Merged(Cart),
    /// Nothing to send.
    Empty,
    /// The server refused the lines; the local cart was emptied.
    Discarded,
    /// Cancelled before the server answered.
    Cancelled,
}

/// Sends the local cart's lines to the server cart.
///
/// The server merge replaces quantities per product, so sending the same
/// lines twice leaves the server cart as sending them once.
#[derive(Debug, Clone)]
pub struct CartSynchronizer {
    api: StorefrontApi,
    local: Arc<LocalCart>,
}

impl CartSynchronizer {
    #[must_use]
    pub const fn new(api: StorefrontApi, local: Arc<LocalCart>) -> Self {
        Self { api, local }
    }

    /// Run one synchronization, abandoning the request if `cancel` fires.
    ///
    /// On success the local cart is left as it is. A data-shaped rejection
    /// (400/422) empties it, since a partially invalid local cart cannot be
    /// retried safely.
    ///
    /// # Errors
    ///
    /// Returns transport and server errors unchanged; the local cart is kept
    /// so a later login can retry.
    pub async fn run(&self, cancel: &CancellationToken) -> ClientResult<SyncOutcome> {
        let lines = self.local.snapshot().await.requests();
        if lines.is_empty() {
            return Ok(SyncOutcome::Empty);
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Cart sync cancelled");
                return Ok(SyncOutcome::Cancelled);
            }
            result = self.api.sync_cart(&lines) => result,
        };

        match result {
            Ok(cart) => {
                tracing::info!(lines = lines.len(), "Local cart merged into server cart");
                Ok(SyncOutcome::Merged(cart))
            }
            Err(e) if e.is_data_rejection() => {
                tracing::warn!(error = %e, "Server rejected local cart, discarding it");
                self.local.clear().await?;
                Ok(SyncOutcome::Discarded)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cart sync failed, keeping local cart");
                Err(e)
            }
        }
    }
}
