//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error response is JSON: `{"error": <code>, "message": <text>}`, plus
//! `results` for commit violations so the client can re-prompt without
//! another round-trip.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use stockroom_core::CommitViolation;

use crate::db::RepositoryError;
use crate::services::FulfillmentError;

/// Message shown to shoppers whose cart went stale between check and commit.
pub const RECHECK_CART_MESSAGE: &str =
    "Some items in your cart are no longer available in the requested quantity. Please review your cart.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Fulfillment operation failed.
    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Fulfillment(err.into())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Fulfillment(err) => match err {
                FulfillmentError::InvalidOrder(_) | FulfillmentError::InvalidCallback(_) => {
                    StatusCode::BAD_REQUEST
                }
                FulfillmentError::CommitViolation(_) => StatusCode::CONFLICT,
                FulfillmentError::UnknownProducts(_)
                | FulfillmentError::DuplicateProduct(_)
                | FulfillmentError::TooManyLines { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                FulfillmentError::BadSignature => StatusCode::UNAUTHORIZED,
                FulfillmentError::Repository(RepositoryError::Database(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                FulfillmentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Fulfillment(err) => match err {
                FulfillmentError::InvalidOrder(_) => "invalid_order",
                FulfillmentError::CommitViolation(_) => "commit_violation",
                FulfillmentError::UnknownProducts(_) => "unknown_products",
                FulfillmentError::DuplicateProduct(_) => "duplicate_product",
                FulfillmentError::TooManyLines { .. } => "too_many_lines",
                FulfillmentError::InvalidCallback(_) => "invalid_callback",
                FulfillmentError::BadSignature => "bad_signature",
                FulfillmentError::Repository(RepositoryError::Database(_)) => "unavailable",
                FulfillmentError::Repository(_) => "internal",
            },
            Self::NotFound(_) => "not_found",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let code = self.code();
        match self {
            Self::Fulfillment(FulfillmentError::CommitViolation(results)) => {
                let violation = CommitViolation {
                    message: RECHECK_CART_MESSAGE.to_string(),
                    results,
                };
                (
                    status,
                    Json(json!({
                        "error": code,
                        "message": violation.message,
                        "results": violation.results,
                    })),
                )
                    .into_response()
            }
            Self::Fulfillment(FulfillmentError::UnknownProducts(ids)) => (
                status,
                Json(json!({
                    "error": code,
                    "message": "Some products no longer exist",
                    "product_ids": ids,
                })),
            )
                .into_response(),
            other => {
                // Don't expose internal error details to clients
                let message = match &other {
                    Self::Fulfillment(FulfillmentError::Repository(RepositoryError::Database(_))) => {
                        "Service temporarily unavailable, please retry".to_string()
                    }
                    Self::Fulfillment(FulfillmentError::Repository(_)) => {
                        "Internal server error".to_string()
                    }
                    Self::Fulfillment(err) => err.to_string(),
                    Self::NotFound(_) => other.to_string(),
                };
                (status, Json(json!({ "error": code, "message": message }))).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for fulfillment actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order committed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stockroom_core::{OrderRequestError, ProductId};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 12".to_string());
        assert_eq!(err.to_string(), "Not found: order 12");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(FulfillmentError::CommitViolation(Vec::new()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(FulfillmentError::InvalidOrder(OrderRequestError::Empty).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::UnknownProducts(vec![ProductId::new(1)]).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(RepositoryError::Database(sqlx::Error::PoolTimedOut).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad row".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(FulfillmentError::BadSignature.into()),
            StatusCode::UNAUTHORIZED
        );
    }
}
