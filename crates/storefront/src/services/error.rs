//! Fulfillment error types.

use thiserror::Error;

use stockroom_core::{FeasibilityResult, OrderRequestError, PaymentCallbackError, ProductId};

use crate::db::RepositoryError;

/// Errors that can occur during fulfillment operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order request is structurally invalid.
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderRequestError),

    /// The authoritative re-check at commit rejected one or more lines.
    #[error("order no longer feasible for {} line(s)", .0.len())]
    CommitViolation(Vec<FeasibilityResult>),

    /// A cart payload references products that do not exist.
    #[error("unknown products: {0:?}")]
    UnknownProducts(Vec<ProductId>),

    /// A cart payload lists the same product twice.
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),

    /// A cart payload has more lines than a cart may hold.
    #[error("cart may contain at most {max} lines")]
    TooManyLines { max: usize },

    /// The callback body could not be decoded.
    #[error("invalid payment callback: {0}")]
    InvalidCallback(#[from] PaymentCallbackError),

    /// The callback signature is missing or does not match.
    #[error("payment callback signature mismatch")]
    BadSignature,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for FulfillmentError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UnknownProducts(ids) => Self::UnknownProducts(ids),
            other => Self::Repository(other),
        }
    }
}
