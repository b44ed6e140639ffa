//! Fulfillment services.
//!
//! # Services
//!
//! - `feasibility` - Advisory per-line stock checks
//! - `checkout` - Authoritative order commit against the ledger
//! - `payments` - Gateway callbacks and compensating stock restoration
//! - `carts` - Server cart operations and local cart synchronization
//!
//! Services borrow a store for the duration of one request:
//!
//! ```rust,ignore
//! let receipt = OrderCommitter::new(state.fulfillment())
//!     .commit(user_id, request)
//!     .await?;
//! ```

mod error;

pub mod carts;
pub mod checkout;
pub mod feasibility;
pub mod payments;

pub use carts::CartService;
pub use checkout::OrderCommitter;
pub use error::FulfillmentError;
pub use feasibility::FeasibilityChecker;
pub use payments::{CallbackOutcome, PaymentCallbackHandler, StockRestorer, sign_callback};
