//! Type-safe unit price using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// A unit price in the shop's single currency.
///
/// Serialized as a decimal string (`"19.99"`) so clients never round-trip
/// prices through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for `quantity` units at this price.
    #[must_use]
    pub fn line_total(&self, quantity: Quantity) -> Self {
        Self(self.0 * Decimal::from(quantity.get()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|p| p.0).sum())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let price = Price::new(Decimal::new(1999, 2));
        let total = price.line_total(Quantity::new(3).unwrap());
        assert_eq!(total.amount(), Decimal::new(5997, 2));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::new(Decimal::new(5, 0)).to_string(), "5.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Price::new(Decimal::new(1050, 2))).unwrap();
        assert_eq!(json, "\"10.50\"");
    }
}
