//! Stockroom shopper-side client.
//!
//! Everything a shop front end needs to feed the fulfillment pipeline:
//!
//! - [`StorefrontApi`] - typed calls to the storefront JSON API
//! - [`LocalCart`] / [`ServerCart`] - the two carts behind one [`CartStore`] trait
//! - [`ShopSession`] - login/logout transitions and the one-shot cart sync
//! - [`Debouncer`] / [`QuantityEditor`] - coalesced, cancellable quantity edits
//! - [`FeasibilityTracker`] - advisory checks that never apply stale results
//!
//! # Example
//!
//! ```rust,no_run
//! use stockroom_client::{ClientConfig, ShopSession};
//! use stockroom_core::{ProductId, Quantity, UserId};
//!
//! # async fn run() -> stockroom_client::ClientResult<()> {
//! let config = ClientConfig::new("http://localhost:3000")?
//!     .with_local_cart_path("/tmp/cart.json");
//! let mut session = ShopSession::open(&config).await?;
//!
//! // Anonymous: goes to the local cart.
//! session.set_quantity(ProductId::new(1), Quantity::ONE).await?;
//!
//! // The identity service signed the shopper in on this client.
//! session.observe(Some(UserId::new(7))).await?;
//! session.finish_sync().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod debounce;
pub mod error;
pub mod feasibility;
pub mod local_cart;
pub mod quantity;
pub mod session;
pub mod sync;

pub use api::StorefrontApi;
pub use cart::{CartStore, ServerCart};
pub use config::ClientConfig;
pub use debounce::Debouncer;
pub use error::{ClientError, ClientResult};
pub use feasibility::{FeasibilityTracker, FeasibilityView};
pub use local_cart::LocalCart;
pub use quantity::QuantityEditor;
pub use session::{AuthState, AuthTransition, ShopSession};
pub use sync::{CartSynchronizer, SyncOutcome};
