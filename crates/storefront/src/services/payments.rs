//! Payment callbacks and compensating stock restoration.
//!
//! The gateway posts `base64({"status": ..., "orderId": ...})`. Successful
//! payments mark the order paid; cancelled or failed payments give the
//! order's stock back through [`StockRestorer`]. Gateways retry, so every
//! outcome here is idempotent.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::instrument;

use stockroom_core::{OrderId, OrderStatus, PaymentCallback};

use super::FulfillmentError;
use crate::store::{FulfillmentStore, PaymentRecord, Restoration};

type HmacSha256 = Hmac<Sha256>;

/// Adds an order's lines back to the ledger.
pub struct StockRestorer<'a> {
    store: &'a dyn FulfillmentStore,
}

impl<'a> StockRestorer<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn FulfillmentStore) -> Self {
        Self { store }
    }

    /// Restore stock for `order_id`, recording `reason` in its history.
    ///
    /// Duplicate, paid and unknown orders are no-ops reported through the
    /// returned [`Restoration`].
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::Repository` if the store fails; nothing is
    /// restored in that case and the caller may retry.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn restore(
        &self,
        order_id: OrderId,
        reason: Option<OrderStatus>,
    ) -> Result<Restoration, FulfillmentError> {
        let restoration = self.store.restore_stock(order_id, reason).await?;

        match &restoration {
            Restoration::Restored { lines } => {
                tracing::info!(lines = lines.len(), "Stock restored");
            }
            Restoration::AlreadyRestored => {
                tracing::info!("Stock already restored, ignoring duplicate");
            }
            Restoration::OrderPaid => {
                tracing::warn!("Refusing to restore stock for a paid order");
            }
            Restoration::OrderNotFound => {
                tracing::warn!("Stock restoration requested for unknown order");
            }
            Restoration::NoLines => {
                tracing::error!("Order has no lines to restore");
            }
        }

        Ok(restoration)
    }
}

/// What a callback did to its order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Payment(PaymentRecord),
    Compensation(Restoration),
}

impl CallbackOutcome {
    /// Short machine-readable description echoed to the gateway.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Payment(PaymentRecord::Marked) => "paid",
            Self::Payment(PaymentRecord::AlreadyPaid) => "already_paid",
            Self::Payment(PaymentRecord::StockAlreadyRestored) => "paid_after_restoration",
            Self::Payment(PaymentRecord::OrderNotFound)
            | Self::Compensation(Restoration::OrderNotFound) => "unknown_order",
            Self::Compensation(Restoration::Restored { .. }) => "stock_restored",
            Self::Compensation(Restoration::AlreadyRestored) => "already_restored",
            Self::Compensation(Restoration::OrderPaid) => "order_paid",
            Self::Compensation(Restoration::NoLines) => "no_lines",
        }
    }
}

/// Verifies, decodes and applies gateway callbacks.
pub struct PaymentCallbackHandler<'a> {
    store: &'a dyn FulfillmentStore,
    secret: Option<&'a SecretString>,
}

impl<'a> PaymentCallbackHandler<'a> {
    /// Create a handler. When `secret` is set, every callback must be signed.
    #[must_use]
    pub const fn new(store: &'a dyn FulfillmentStore, secret: Option<&'a SecretString>) -> Self {
        Self { store, secret }
    }

    /// Apply one callback.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::BadSignature` when a secret is configured and the
    ///   signature is missing or wrong.
    /// - `FulfillmentError::InvalidCallback` when the body cannot be decoded.
    /// - `FulfillmentError::Repository` on infrastructure failure.
    #[instrument(skip_all, fields(order_id))]
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<CallbackOutcome, FulfillmentError> {
        if let Some(secret) = self.secret {
            let signature = signature.ok_or(FulfillmentError::BadSignature)?;
            if !verify_signature(secret, body, signature) {
                return Err(FulfillmentError::BadSignature);
            }
        }

        let callback = PaymentCallback::decode(&String::from_utf8_lossy(body))?;
        tracing::Span::current().record("order_id", tracing::field::display(callback.order_id));
        tracing::info!(
            order_id = %callback.order_id,
            status = ?callback.status,
            "Payment callback received"
        );

        if let Some(reason) = callback.status.failure_status() {
            let restoration = StockRestorer::new(self.store)
                .restore(callback.order_id, Some(reason))
                .await?;
            return Ok(CallbackOutcome::Compensation(restoration));
        }

        let record = self.store.mark_paid(callback.order_id).await?;
        match record {
            PaymentRecord::Marked => {
                tracing::info!(order_id = %callback.order_id, "Order paid");
            }
            PaymentRecord::AlreadyPaid => {
                tracing::info!(order_id = %callback.order_id, "Order already paid");
            }
            PaymentRecord::StockAlreadyRestored => {
                tracing::error!(
                    order_id = %callback.order_id,
                    "Payment received after stock was restored; needs manual review"
                );
            }
            PaymentRecord::OrderNotFound => {
                tracing::warn!(order_id = %callback.order_id, "Payment callback for unknown order");
            }
        }
        Ok(CallbackOutcome::Payment(record))
    }
}

/// Check `signature` (hex HMAC-SHA256 of `body`) in constant time.
fn verify_signature(secret: &SecretString, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature a gateway would send for `body`.
///
/// # Errors
///
/// Returns `InvalidLength` if the key is rejected by the MAC.
pub fn sign_callback(secret: &SecretString, body: &[u8]) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
