//! Domain models for storefront.
//!
//! Ledger, cart and order types live in `stockroom-core`; this module only
//! holds what the HTTP layer keeps in the session.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
