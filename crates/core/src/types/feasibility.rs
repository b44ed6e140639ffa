//! Advisory "can this quantity be ordered right now" evaluation.
//!
//! The rule is shared by the storefront's feasibility endpoint and by the
//! order committer's violation report. It is pure: callers supply the stock
//! level they read, and nothing here locks or mutates the ledger.

use serde::{Deserialize, Serialize};

use super::{ProductId, Quantity};

/// Ledger counters for one product, as read at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub quantity_in_stock: i32,
    pub max_order_quantity: i32,
}

/// Why a quantity cannot be ordered.
///
/// When both limits are exceeded, `InsufficientStock` is reported and its
/// `limit` carries the stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Infeasibility {
    /// More units requested than are in stock.
    InsufficientStock { limit: i32 },
    /// More units requested than one order may contain.
    ExceededMaxOrderQuantity { limit: i32 },
    /// The product no longer exists.
    ProductNotFound,
}

impl Infeasibility {
    /// The numeric limit the shopper must stay within, if any.
    #[must_use]
    pub const fn limit(&self) -> Option<i32> {
        match self {
            Self::InsufficientStock { limit } | Self::ExceededMaxOrderQuantity { limit } => {
                Some(*limit)
            }
            Self::ProductNotFound => None,
        }
    }
}

impl std::fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientStock { limit } => write!(f, "only {limit} left in stock"),
            Self::ExceededMaxOrderQuantity { limit } => {
                write!(f, "at most {limit} per order")
            }
            Self::ProductNotFound => write!(f, "product is no longer available"),
        }
    }
}

/// Per-product answer of a feasibility check. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub can_be_ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Infeasibility>,
}

impl FeasibilityResult {
    /// Evaluate `quantity` against the stock level read for `product_id`.
    ///
    /// `level` is `None` when the product does not exist.
    #[must_use]
    pub fn evaluate(product_id: ProductId, quantity: Quantity, level: Option<&StockLevel>) -> Self {
        let reason = match level {
            None => Some(Infeasibility::ProductNotFound),
            Some(level) if quantity.get() > level.quantity_in_stock => {
                Some(Infeasibility::InsufficientStock {
                    limit: level.quantity_in_stock.max(0),
                })
            }
            Some(level) if quantity.get() > level.max_order_quantity => {
                Some(Infeasibility::ExceededMaxOrderQuantity {
                    limit: level.max_order_quantity,
                })
            }
            Some(_) => None,
        };

        Self {
            product_id,
            quantity,
            can_be_ordered: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn level(stock: i32, max: i32) -> StockLevel {
        StockLevel {
            product_id: ProductId::new(1),
            quantity_in_stock: stock,
            max_order_quantity: max,
        }
    }

    fn qty(n: i32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_within_both_limits_is_orderable() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(3), Some(&level(5, 3)));
        assert!(result.can_be_ordered);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_exceeding_max_order_quantity() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(4), Some(&level(5, 3)));
        assert!(!result.can_be_ordered);
        assert_eq!(
            result.reason,
            Some(Infeasibility::ExceededMaxOrderQuantity { limit: 3 })
        );
    }

    #[test]
    fn test_insufficient_stock() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(4), Some(&level(3, 10)));
        assert_eq!(
            result.reason,
            Some(Infeasibility::InsufficientStock { limit: 3 })
        );
    }

    #[test]
    fn test_insufficient_stock_wins_when_both_exceeded() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(9), Some(&level(2, 5)));
        assert_eq!(
            result.reason,
            Some(Infeasibility::InsufficientStock { limit: 2 })
        );
    }

    #[test]
    fn test_missing_product() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(1), None);
        assert!(!result.can_be_ordered);
        assert_eq!(result.reason, Some(Infeasibility::ProductNotFound));
        assert_eq!(result.reason.unwrap().limit(), None);
    }

    #[test]
    fn test_exact_stock_is_orderable() {
        let result = FeasibilityResult::evaluate(ProductId::new(1), qty(5), Some(&level(5, 5)));
        assert!(result.can_be_ordered);
    }

    #[test]
    fn test_reason_wire_format() {
        let result = FeasibilityResult::evaluate(ProductId::new(8), qty(4), Some(&level(5, 3)));
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["product_id"], 8);
        assert_eq!(json["can_be_ordered"], false);
        assert_eq!(json["reason"]["kind"], "exceeded_max_order_quantity");
        assert_eq!(json["reason"]["limit"], 3);
    }
}
