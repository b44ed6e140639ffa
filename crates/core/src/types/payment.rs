//! Payment gateway callback payload.
//!
//! The gateway posts `base64(json)` where the JSON is
//! `{ "status": "success" | "already_paid" | "cancel" | "failure", "orderId": 42 }`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::{OrderId, PaymentStatus};

/// Errors decoding a callback payload.
#[derive(thiserror::Error, Debug)]
pub enum PaymentCallbackError {
    #[error("callback is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("callback payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A decoded gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub status: PaymentStatus,
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: OrderId,
}

impl PaymentCallback {
    /// Decode the opaque form posted by the gateway. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `PaymentCallbackError` if the data is not base64 or not the expected JSON.
    pub fn decode(data: &str) -> Result<Self, PaymentCallbackError> {
        let bytes = STANDARD.decode(data.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Encode into the opaque gateway form.
    ///
    /// # Errors
    ///
    /// Returns `PaymentCallbackError::Payload` if serialization fails.
    pub fn encode(&self) -> Result<String, PaymentCallbackError> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gateway_payload() {
        let data = STANDARD.encode(r#"{"status":"failure","orderId":17}"#);
        let callback = PaymentCallback::decode(&data).unwrap();
        assert_eq!(callback.status, PaymentStatus::Failure);
        assert_eq!(callback.order_id, OrderId::new(17));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            PaymentCallback::decode("%%%"),
            Err(PaymentCallbackError::Encoding(_))
        ));

        let not_json = STANDARD.encode("hello");
        assert!(matches!(
            PaymentCallback::decode(&not_json),
            Err(PaymentCallbackError::Payload(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let data = STANDARD.encode(r#"{"status":"refunded","orderId":1}"#);
        assert!(PaymentCallback::decode(&data).is_err());
    }

    #[test]
    fn test_encoded_form_uses_gateway_field_names() {
        let encoded = PaymentCallback {
            status: PaymentStatus::Cancel,
            order_id: OrderId::new(3),
        }
        .encode()
        .unwrap();
        let json = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(json.contains("\"orderId\":3"));
        assert!(json.contains("\"status\":\"cancel\""));
    }
}
