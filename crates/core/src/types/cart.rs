//! Cart lines and carts.
//!
//! A cart is a wish-list, never a reservation. Both the anonymous local cart
//! and the per-user server cart share these types, and both follow the same
//! per-product state machine:
//!
//! ```text
//! Absent ──upsert(q)──▶ Present(q) ──upsert(q')──▶ Present(q')
//!                           │
//!                           └──delete──▶ Absent
//! ```
//!
//! Upsert replaces the quantity; it never accumulates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{LineRequest, Price, ProductId, Quantity};

/// Display data captured when a product is added to a local cart.
///
/// Not revalidated on render; staleness is corrected at feasibility time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub title: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<LineSnapshot>,
}

impl CartLine {
    /// Create a line without display data.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
            snapshot: None,
        }
    }

    /// Attach display data.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: LineSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

/// A mapping from product to cart line with unique keys.
///
/// Serialized as a list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: BTreeMap<ProductId, CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the line for its product.
    ///
    /// Returns the line that was replaced, if any.
    pub fn upsert(&mut self, line: CartLine) -> Option<CartLine> {
        self.lines.insert(line.product_id, line)
    }

    /// Remove the line for `product_id`.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        self.lines.remove(&product_id)
    }

    /// Get the line for `product_id`.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.get(&product_id)
    }

    /// Iterate over the lines, ordered by product id.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines.values().map(|l| i64::from(l.quantity.get())).sum()
    }

    /// Subtotal from the display snapshots. Lines without a snapshot count as zero.
    #[must_use]
    pub fn snapshot_subtotal(&self) -> Price {
        self.lines
            .values()
            .filter_map(|l| l.snapshot.as_ref().map(|s| s.price.line_total(l.quantity)))
            .sum()
    }

    /// The `(product, quantity)` pairs fed to feasibility checks and checkout.
    #[must_use]
    pub fn requests(&self) -> Vec<LineRequest> {
        self.lines
            .values()
            .map(|l| LineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.upsert(line);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines.into_values().collect()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut cart = Self::new();
        for line in iter {
            cart.upsert(line);
        }
        cart
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn line(product: i32, quantity: i32) -> CartLine {
        CartLine::new(ProductId::new(product), Quantity::new(quantity).unwrap())
    }

    #[test]
    fn test_upsert_replaces_quantity() {
        let mut cart = Cart::new();
        assert!(cart.upsert(line(1, 2)).is_none());
        let previous = cart.upsert(line(1, 5)).unwrap();

        assert_eq!(previous.quantity.get(), 2);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity.get(), 5);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut once = Cart::new();
        once.upsert(line(1, 3));

        let mut twice = Cart::new();
        twice.upsert(line(1, 3));
        twice.upsert(line(1, 3));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_returns_to_absent() {
        let mut cart = Cart::new();
        cart.upsert(line(4, 1));
        assert!(cart.remove(ProductId::new(4)).is_some());
        assert!(cart.get(ProductId::new(4)).is_none());
        assert!(cart.remove(ProductId::new(4)).is_none());
    }

    #[test]
    fn test_duplicate_lines_collapse_on_deserialize() {
        let json = r#"[{"product_id":1,"quantity":2},{"product_id":1,"quantity":7}]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity.get(), 7);
    }

    #[test]
    fn test_snapshot_subtotal_and_item_count() {
        let mut cart = Cart::new();
        cart.upsert(line(1, 2).with_snapshot(LineSnapshot {
            title: "Mug".to_string(),
            price: Price::new(Decimal::new(1250, 2)),
            image_url: None,
        }));
        cart.upsert(line(2, 1));

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.snapshot_subtotal().amount(), Decimal::new(2500, 2));
    }

    #[test]
    fn test_requests_follow_lines() {
        let cart: Cart = vec![line(3, 1), line(1, 4)].into();
        let requests = cart.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests.first().unwrap().product_id, ProductId::new(1));
    }
}
