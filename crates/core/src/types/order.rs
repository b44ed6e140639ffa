//! Order requests, receipts and the immutable order record.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FeasibilityResult, OrderId, OrderStatus, PaymentMethod, Price, ProductId, Quantity, UserId};

/// Upper bound on distinct products in one order.
pub const MAX_ORDER_LINES: usize = 100;

/// A `(product, quantity)` pair as sent to feasibility checks and checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Errors in recipient details.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecipientError {
    #[error("recipient name cannot be empty")]
    EmptyName,
    #[error("recipient email must look like local@domain")]
    InvalidEmail,
    #[error("recipient address cannot be empty")]
    EmptyAddress,
}

/// Errors in an order request, detected before touching the ledger.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderRequestError {
    #[error("order must contain at least one line")]
    Empty,
    #[error("order may contain at most {max} lines")]
    TooManyLines { max: usize },
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),
    #[error(transparent)]
    Recipient(#[from] RecipientError),
}

/// Who receives the parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: String,
}

impl Recipient {
    /// Check that the recipient can be shipped to.
    ///
    /// # Errors
    ///
    /// Returns the first failing field.
    pub fn validate(&self) -> Result<(), RecipientError> {
        if self.name.trim().is_empty() {
            return Err(RecipientError::EmptyName);
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(RecipientError::InvalidEmail),
        }
        if self.address.trim().is_empty() {
            return Err(RecipientError::EmptyAddress);
        }
        Ok(())
    }
}

/// Checkout submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<LineRequest>,
    pub recipient: Recipient,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CreateOrderRequest {
    /// Structural validation: non-empty, bounded, one line per product.
    ///
    /// Duplicate products are rejected rather than merged because the ledger
    /// update applies each product row once.
    ///
    /// # Errors
    ///
    /// Returns `OrderRequestError` describing the first problem found.
    pub fn validate(&self) -> Result<(), OrderRequestError> {
        if self.lines.is_empty() {
            return Err(OrderRequestError::Empty);
        }
        if self.lines.len() > MAX_ORDER_LINES {
            return Err(OrderRequestError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }
        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if !seen.insert(line.product_id) {
                return Err(OrderRequestError::DuplicateProduct(line.product_id));
            }
        }
        self.recipient.validate()?;
        Ok(())
    }
}

/// Returned by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: Price,
    pub status: OrderStatus,
}

/// Returned when the authoritative re-check at commit fails.
///
/// `results` holds the freshly read feasibility of every offending line so the
/// client can re-prompt without another round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitViolation {
    pub message: String,
    pub results: Vec<FeasibilityResult>,
}

/// Snapshot of what was decremented for one product. Write-once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Price,
}

/// One row of the append-only status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub recorded_at: DateTime<Utc>,
}

/// An order with its lines and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub recipient: Recipient,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_restored_at: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
    pub history: Vec<StatusEntry>,
}

impl OrderView {
    /// Latest recorded status.
    #[must_use]
    pub fn status(&self) -> Option<OrderStatus> {
        self.history.last().map(|e| e.status)
    }

    /// Order total from the line snapshots.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines
            .iter()
            .map(|l| l.unit_price.line_total(l.quantity))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            address: "1 Loop Road".to_string(),
        }
    }

    fn request(products: &[i32]) -> CreateOrderRequest {
        CreateOrderRequest {
            lines: products
                .iter()
                .map(|&p| LineRequest {
                    product_id: ProductId::new(p),
                    quantity: Quantity::ONE,
                })
                .collect(),
            recipient: recipient(),
            payment_method: PaymentMethod::Online,
        }
    }

    #[test]
    fn test_valid_request() {
        assert_eq!(request(&[1, 2]).validate(), Ok(()));
    }

    #[test]
    fn test_empty_request_rejected() {
        assert_eq!(request(&[]).validate(), Err(OrderRequestError::Empty));
    }

    #[test]
    fn test_duplicate_product_rejected() {
        assert_eq!(
            request(&[1, 2, 1]).validate(),
            Err(OrderRequestError::DuplicateProduct(ProductId::new(1)))
        );
    }

    #[test]
    fn test_too_many_lines_rejected() {
        let products: Vec<i32> = (1..=101).collect();
        assert!(matches!(
            request(&products).validate(),
            Err(OrderRequestError::TooManyLines { .. })
        ));
    }

    #[test]
    fn test_recipient_validation() {
        let mut r = recipient();
        r.email = "nobody".to_string();
        assert_eq!(r.validate(), Err(RecipientError::InvalidEmail));

        let mut r = recipient();
        r.name = "  ".to_string();
        assert_eq!(r.validate(), Err(RecipientError::EmptyName));

        let mut r = recipient();
        r.address = String::new();
        assert_eq!(r.validate(), Err(RecipientError::EmptyAddress));
    }

    #[test]
    fn test_payment_method_defaults_to_online() {
        let json = r#"{"lines":[{"product_id":1,"quantity":1}],
            "recipient":{"name":"Ada","email":"a@b.c","address":"x"}}"#;
        let parsed: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.payment_method, PaymentMethod::Online);
    }
}
