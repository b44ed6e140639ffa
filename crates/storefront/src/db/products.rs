//! Product and stock ledger reads.
//!
//! Nothing in this module mutates `quantity_in_stock`; decrements and
//! increments live in [`super::orders`] where they run inside the order
//! transaction.

use rust_decimal::Decimal;
use sqlx::PgPool;

use stockroom_core::{Price, Product, ProductId, StockLevel};

use super::RepositoryError;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    price: Decimal,
    image_url: Option<String>,
    quantity_in_stock: i32,
    max_order_quantity: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            price: Price::new(row.price),
            image_url: row.image_url,
            quantity_in_stock: row.quantity_in_stock,
            max_order_quantity: row.max_order_quantity,
        }
    }
}

/// Internal row type for ledger-only queries.
#[derive(Debug, sqlx::FromRow)]
struct StockLevelRow {
    id: i32,
    quantity_in_stock: i32,
    max_order_quantity: i32,
}

impl From<StockLevelRow> for StockLevel {
    fn from(row: StockLevelRow) -> Self {
        Self {
            product_id: ProductId::new(row.id),
            quantity_in_stock: row.quantity_in_stock,
            max_order_quantity: row.max_order_quantity,
        }
    }
}

/// Input for seeding a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub quantity_in_stock: i32,
    pub max_order_quantity: i32,
}

/// Repository for product reads and catalog seeding.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, price, image_url, quantity_in_stock, max_order_quantity
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Read the ledger counters for the given products.
    ///
    /// Plain snapshot read without row locks. Missing products are simply
    /// absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_levels(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<StockLevel>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockLevelRow>(
            r"
            SELECT id, quantity_in_stock, max_order_quantity
            FROM shop.product
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List every product ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, price, image_url, quantity_in_stock, max_order_quantity
            FROM shop.product
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a catalog product with its initial stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails, including when
    /// the ledger CHECK constraints reject the counters.
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (title, price, image_url, quantity_in_stock, max_order_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, price, image_url, quantity_in_stock, max_order_quantity
            ",
        )
        .bind(&input.title)
        .bind(input.price.amount())
        .bind(&input.image_url)
        .bind(input.quantity_in_stock)
        .bind(input.max_order_quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
