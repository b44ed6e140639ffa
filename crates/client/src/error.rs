//! Client error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use stockroom_core::{CommitViolation, FeasibilityResult, ProductId};

/// Errors surfaced by the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid storefront URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The storefront requires a signed-in shopper.
    #[error("not signed in")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    /// The storefront rejected the payload itself (400/422).
    ///
    /// Retrying the same payload will fail again.
    #[error("rejected ({code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
        product_ids: Vec<ProductId>,
    },

    /// The authoritative re-check at checkout failed.
    #[error("{}", .0.message)]
    CommitViolation(CommitViolation),

    /// The storefront or its database is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local cart file could not be read or written.
    #[error("local cart I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Error body returned by the storefront.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    results: Vec<FeasibilityResult>,
    #[serde(default)]
    product_ids: Vec<ProductId>,
}

impl ClientError {
    /// Map a non-success response to an error.
    ///
    /// Bodies that are not the storefront's JSON error shape keep their raw
    /// text as the message.
    #[must_use]
    pub fn from_response(status: StatusCode, text: &str) -> Self {
        let body = serde_json::from_str::<ErrorBody>(text).unwrap_or_else(|_| ErrorBody {
            message: text.to_string(),
            ..ErrorBody::default()
        });

        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound(body.message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Rejected {
                status: status.as_u16(),
                code: body.error,
                message: body.message,
                product_ids: body.product_ids,
            },
            StatusCode::CONFLICT => Self::CommitViolation(CommitViolation {
                message: body.message,
                results: body.results,
            }),
            StatusCode::SERVICE_UNAVAILABLE => Self::Unavailable(body.message),
            _ => Self::Server {
                status: status.as_u16(),
                message: body.message,
            },
        }
    }

    /// Whether the storefront refused the data itself.
    ///
    /// A local cart whose sync is rejected this way is treated as corrupted.
    #[must_use]
    pub const fn is_data_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Whether the same request may succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Unavailable(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stockroom_core::Infeasibility;

    use super::*;

    #[test]
    fn test_unprocessable_is_data_rejection() {
        let body = r#"{"error":"unknown_products","message":"Some products no longer exist","product_ids":[4,9]}"#;
        let err = ClientError::from_response(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert!(err.is_data_rejection());
        assert!(!err.is_retryable());
        match err {
            ClientError::Rejected {
                status,
                code,
                product_ids,
                ..
            } => {
                assert_eq!(status, 422);
                assert_eq!(code, "unknown_products");
                assert_eq!(product_ids, vec![ProductId::new(4), ProductId::new(9)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_conflict_carries_fresh_results() {
        let body = r#"{
            "error": "commit_violation",
            "message": "Please review your cart.",
            "results": [{
                "product_id": 1,
                "quantity": 5,
                "can_be_ordered": false,
                "reason": {"kind": "insufficient_stock", "limit": 3}
            }]
        }"#;
        let err = ClientError::from_response(StatusCode::CONFLICT, body);

        let ClientError::CommitViolation(violation) = err else {
            panic!("expected a commit violation");
        };
        assert_eq!(violation.message, "Please review your cart.");
        assert_eq!(
            violation.results.first().unwrap().reason,
            Some(Infeasibility::InsufficientStock { limit: 3 })
        );
    }

    #[test]
    fn test_unavailable_is_retryable() {
        let body = r#"{"error":"unavailable","message":"Service temporarily unavailable, please retry"}"#;
        let err = ClientError::from_response(StatusCode::SERVICE_UNAVAILABLE, body);
        assert!(err.is_retryable());
        assert!(!err.is_data_rejection());
    }

    #[test]
    fn test_non_json_body_kept_as_message() {
        let err = ClientError::from_response(StatusCode::BAD_GATEWAY, "upstream down");
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized() {
        let err = ClientError::from_response(StatusCode::UNAUTHORIZED, "{}");
        assert!(matches!(err, ClientError::Unauthorized));
    }
}
