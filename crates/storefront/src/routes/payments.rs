//! Payment gateway callback route.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::PaymentCallbackHandler;
use crate::state::AppState;

/// Header carrying `hex(HMAC-SHA256(secret, body))`.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// POST /api/payments/callback
///
/// The body is the gateway's base64-encoded JSON. Every well-formed callback
/// is acknowledged with 200, including duplicates and unknown orders, so the
/// gateway stops retrying.
///
/// # Errors
///
/// - 400 if the body cannot be decoded
/// - 401 if a callback secret is configured and the signature is wrong
/// - 503 on transient storage failure (the gateway should retry)
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let handler = PaymentCallbackHandler::new(
        state.fulfillment(),
        state.config().payment_callback_secret.as_ref(),
    );
    let outcome = handler.handle(&body, signature).await?;

    Ok(Json(json!({ "received": true, "outcome": outcome.label() })))
}
