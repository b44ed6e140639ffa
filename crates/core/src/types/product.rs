//! Catalog product with its stock ledger counters.

use serde::{Deserialize, Serialize};

use super::{LineSnapshot, Price, ProductId, StockLevel};

/// A product as stored in the catalog.
///
/// `quantity_in_stock` and `max_order_quantity` form the stock ledger; the
/// remaining fields are display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub quantity_in_stock: i32,
    pub max_order_quantity: i32,
}

impl Product {
    /// Ledger counters of this product.
    #[must_use]
    pub const fn stock_level(&self) -> StockLevel {
        StockLevel {
            product_id: self.id,
            quantity_in_stock: self.quantity_in_stock,
            max_order_quantity: self.max_order_quantity,
        }
    }

    /// Display data captured into a local cart line.
    #[must_use]
    pub fn snapshot(&self) -> LineSnapshot {
        LineSnapshot {
            title: self.title.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }
}
