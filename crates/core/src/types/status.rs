//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status, recorded in the append-only status history.
///
/// ```text
/// Placed ──success──▶ Paid
///   │
///   ├──cancel──▶ Cancelled ─────▶ StockRestored
///   └──failure─▶ PaymentFailed ─▶ StockRestored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Stock decremented, awaiting the payment gateway.
    Placed,
    /// Gateway confirmed payment.
    Paid,
    /// Shopper or gateway cancelled the payment.
    Cancelled,
    /// Gateway reported a failed payment.
    PaymentFailed,
    /// The order's lines were added back to the ledger.
    StockRestored,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed => write!(f, "placed"),
            Self::Paid => write!(f, "paid"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::PaymentFailed => write!(f, "payment_failed"),
            Self::StockRestored => write!(f, "stock_restored"),
        }
    }
}

/// How the shopper intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Redirect to the online payment gateway; settled by callback.
    #[default]
    Online,
    /// Bank transfer; settled manually.
    BankTransfer,
    /// Paid to the courier on delivery.
    CashOnDelivery,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "bank_transfer" => Ok(Self::BankTransfer),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Status reported by the payment gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Success,
    AlreadyPaid,
    Cancel,
    Failure,
}

impl PaymentStatus {
    /// Whether this outcome settles the order as paid.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Success | Self::AlreadyPaid)
    }

    /// Whether this outcome triggers stock restoration.
    #[must_use]
    pub const fn restores_stock(self) -> bool {
        matches!(self, Self::Cancel | Self::Failure)
    }

    /// History entry recorded for a compensating outcome.
    #[must_use]
    pub const fn failure_status(self) -> Option<OrderStatus> {
        match self {
            Self::Cancel => Some(OrderStatus::Cancelled),
            Self::Failure => Some(OrderStatus::PaymentFailed),
            Self::Success | Self::AlreadyPaid => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_partitions() {
        for status in [
            PaymentStatus::Success,
            PaymentStatus::AlreadyPaid,
            PaymentStatus::Cancel,
            PaymentStatus::Failure,
        ] {
            assert_ne!(status.is_paid(), status.restores_stock());
        }
    }

    #[test]
    fn test_failure_status_mapping() {
        assert_eq!(
            PaymentStatus::Cancel.failure_status(),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(
            PaymentStatus::Failure.failure_status(),
            Some(OrderStatus::PaymentFailed)
        );
        assert_eq!(PaymentStatus::Success.failure_status(), None);
    }

    #[test]
    fn test_payment_status_wire_names() {
        let parsed: PaymentStatus = serde_json::from_str("\"already_paid\"").unwrap();
        assert_eq!(parsed, PaymentStatus::AlreadyPaid);
    }

    #[test]
    fn test_payment_method_from_str() {
        assert_eq!(
            "cash_on_delivery".parse::<PaymentMethod>(),
            Ok(PaymentMethod::CashOnDelivery)
        );
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
