//! The shopper's session: which cart is active and when to synchronize.
//!
//! ```text
//! Anonymous ──login──▶ Authenticated(user)   spawns one cart sync
//!     ▲                      │
//!     └──────logout──────────┘                cancels sync, empties local cart
//! ```
//!
//! Only transitions trigger work. Observing the same authentication state
//! again does nothing. Server cart writes wait for a pending sync, so the
//! merge can never land on top of a newer edit.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use stockroom_core::{CartLine, ProductId, Quantity, UserId};

use crate::{
    CartStore, CartSynchronizer, ClientConfig, ClientResult, LocalCart, ServerCart,
    StorefrontApi, SyncOutcome,
};

/// Authentication state as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(UserId),
}

/// What an observation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTransition {
    Unchanged,
    /// A cart sync was started.
    LoggedIn(UserId),
    LoggedOut,
}

struct InFlightSync {
    cancel: CancellationToken,
    handle: JoinHandle<ClientResult<SyncOutcome>>,
}

/// Explicit per-shopper client state, created at session start.
pub struct ShopSession {
    api: StorefrontApi,
    local: Arc<LocalCart>,
    server: ServerCart,
    auth: AuthState,
    sync: Option<InFlightSync>,
    settled: Option<ClientResult<SyncOutcome>>,
}

impl ShopSession {
    /// Open a session: builds the API client and loads the local cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the local cart
    /// file cannot be read.
    pub async fn open(config: &ClientConfig) -> ClientResult<Self> {
        let api = StorefrontApi::new(config)?;
        let local = LocalCart::open(&config.local_cart_path).await?;
        Ok(Self::new(api, local))
    }

    /// Start anonymous with the given API client and local cart.
    #[must_use]
    pub fn new(api: StorefrontApi, local: LocalCart) -> Self {
        Self {
            server: ServerCart::new(api.clone()),
            api,
            local: Arc::new(local),
            auth: AuthState::Anonymous,
            sync: None,
            settled: None,
        }
    }

    #[must_use]
    pub const fn api(&self) -> &StorefrontApi {
        &self.api
    }

    #[must_use]
    pub const fn auth(&self) -> AuthState {
        self.auth
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    #[must_use]
    pub fn local_cart(&self) -> &LocalCart {
        &self.local
    }

    /// The cart that is authoritative for this shopper right now.
    ///
    /// Reads only; edits go through [`Self::set_quantity`] and
    /// [`Self::remove`], which order themselves after a pending sync.
    #[must_use]
    pub fn cart(&self) -> &dyn CartStore {
        if self.is_authenticated() {
            &self.server
        } else {
            self.local.as_ref()
        }
    }

    /// Feed the identity service's current answer.
    ///
    /// Login from anonymous starts a cart sync (cancelling one still in
    /// flight). Switching directly between users is a logout followed by a
    /// login.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the local cart cannot be emptied on logout.
    pub async fn observe(&mut self, user: Option<UserId>) -> ClientResult<AuthTransition> {
        let next = user.map_or(AuthState::Anonymous, AuthState::Authenticated);
        if next == self.auth {
            return Ok(AuthTransition::Unchanged);
        }

        if matches!(self.auth, AuthState::Authenticated(_)) {
            self.logout().await?;
        }

        match next {
            AuthState::Anonymous => Ok(AuthTransition::LoggedOut),
            AuthState::Authenticated(user_id) => {
                self.auth = next;
                self.start_sync(user_id);
                Ok(AuthTransition::LoggedIn(user_id))
            }
        }
    }

    fn start_sync(&mut self, user_id: UserId) {
        self.cancel_sync();

        let cancel = CancellationToken::new();
        let synchronizer = CartSynchronizer::new(self.api.clone(), Arc::clone(&self.local));
        let token = cancel.clone();
        let handle = tokio::spawn(async move { synchronizer.run(&token).await });

        tracing::debug!(%user_id, "Cart sync started");
        self.sync = Some(InFlightSync { cancel, handle });
    }

    fn cancel_sync(&mut self) {
        self.settled = None;
        if let Some(sync) = self.sync.take() {
            sync.cancel.cancel();
        }
    }

    /// Wait for a pending sync and keep its outcome for [`Self::finish_sync`].
    async fn settle_sync(&mut self) {
        let Some(sync) = self.sync.take() else {
            return;
        };
        let outcome = match sync.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Ok(SyncOutcome::Cancelled),
            Err(e) => {
                tracing::error!(error = %e, "Cart sync task failed");
                Ok(SyncOutcome::Cancelled)
            }
        };
        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Cart sync failed, local cart kept");
        }
        self.settled = Some(outcome);
    }

    /// Wait for the sync started by the last login.
    ///
    /// Returns `None` if no sync was started or its outcome was already
    /// taken.
    pub async fn finish_sync(&mut self) -> Option<ClientResult<SyncOutcome>> {
        self.settle_sync().await;
        self.settled.take()
    }

    async fn logout(&mut self) -> ClientResult<()> {
        self.cancel_sync();
        self.auth = AuthState::Anonymous;
        // Already merged into the server cart, or belongs to whoever was signed in.
        self.local.clear().await?;
        tracing::debug!("Logged out, local cart emptied");
        Ok(())
    }

    /// Add or replace a line in the active cart.
    ///
    /// Anonymous shoppers get the product's display data captured into the
    /// local cart. Signed-in shoppers' edits wait for the login sync first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for unknown products, or the active
    /// cart's error.
    pub async fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> ClientResult<()> {
        let mut line = CartLine::new(product_id, quantity);
        if self.is_authenticated() {
            self.settle_sync().await;
        } else {
            let snapshot = match self.local.snapshot().await.get(product_id) {
                Some(existing) => existing.snapshot.clone(),
                None => Some(self.api.product(product_id).await?.snapshot()),
            };
            line.snapshot = snapshot;
        }
        self.cart().upsert(line).await
    }

    /// Remove a line from the active cart.
    ///
    /// # Errors
    ///
    /// Returns the active cart's error.
    pub async fn remove(&mut self, product_id: ProductId) -> ClientResult<()> {
        if self.is_authenticated() {
            self.settle_sync().await;
        }
        self.cart().delete(product_id).await
    }

    /// Tear down: cancel in-flight work.
    pub fn close(&mut self) {
        self.cancel_sync();
    }
}

impl Drop for ShopSession {
    fn drop(&mut self) {
        self.cancel_sync();
    }
}
