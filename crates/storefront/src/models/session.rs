//! Session-related types.
//!
//! Types stored in the session for authentication state. Login itself is
//! owned by the identity service in front of the storefront; it writes
//! [`CurrentUser`] under [`keys::CURRENT_USER`] and this crate only reads it.

use serde::{Deserialize, Serialize};

use stockroom_core::UserId;

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID; owns the server cart and orders.
    pub id: UserId,
    /// Email address, for error reports only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Ids of orders this session placed without a signed-in user.
    pub const PLACED_ORDERS: &str = "placed_orders";
}
