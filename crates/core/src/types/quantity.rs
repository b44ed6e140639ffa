//! Positive order/cart quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantities are never valid cart or order lines.
    #[error("quantity must be positive (got {0})")]
    NotPositive(i64),
    /// The value does not fit the ledger's integer column.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// A strictly positive number of units.
///
/// Stored as `INTEGER` in the ledger, so the upper bound is `i32::MAX`.
/// Deserialization rejects zero and negative values, which keeps
/// `Present(0)` cart lines unrepresentable.
///
/// ```
/// use stockroom_core::Quantity;
///
/// assert!(Quantity::new(3).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-1).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity, rejecting non-positive values.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for values below one.
    pub fn new(value: i32) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let narrowed = i32::try_from(value).map_err(|_| {
            if value <= 0 {
                QuantityError::NotPositive(value)
            } else {
                QuantityError::TooLarge(value)
            }
        })?;
        Self::new(narrowed)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
