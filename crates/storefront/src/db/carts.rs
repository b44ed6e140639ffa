//! Server cart persistence.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use stockroom_core::{Cart, CartLine, LineRequest, LineSnapshot, Price, ProductId, Quantity, UserId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    quantity: i32,
    title: String,
    price: Decimal,
    image_url: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::try_from(row.quantity)
            .map_err(|e| RepositoryError::DataCorruption(format!("cart quantity: {e}")))?;
        Ok(Self::new(ProductId::new(row.product_id), quantity).with_snapshot(LineSnapshot {
            title: row.title,
            price: Price::new(row.price),
            image_url: row.image_url,
        }))
    }
}

/// Map a foreign-key failure on `cart_line.product_id` to `UnknownProducts`.
fn unknown_products_on_fk(e: sqlx::Error, products: &[ProductId]) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::UnknownProducts(products.to_vec());
    }
    RepositoryError::Database(e)
}

/// Repository for `shop.cart_line`.
pub struct CartLineRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartLineRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's cart with display data joined from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.product_id, c.quantity, p.title, p.price, p.image_url
            FROM shop.cart_line c
            JOIN shop.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    /// Insert or replace the quantity of one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownProducts` if the product does not
    /// exist, `RepositoryError::Database` for other failures.
    pub async fn upsert(&self, user_id: UserId, line: LineRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.cart_line (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = EXCLUDED.quantity, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(line.product_id)
        .bind(line.quantity.get())
        .execute(self.pool)
        .await
        .map_err(|e| unknown_products_on_fk(e, &[line.product_id]))?;

        Ok(())
    }

    /// Delete one line. Returns whether a line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_line WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Upsert every line in one transaction.
    ///
    /// Unknown products reject the whole batch so a corrupted local cart never
    /// half-applies.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownProducts` listing the missing ids, or
    /// `RepositoryError::Database` if a statement fails.
    pub async fn merge(&self, user_id: UserId, lines: &[LineRequest]) -> Result<Cart, RepositoryError> {
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let quantities: Vec<i32> = lines.iter().map(|l| l.quantity.get()).collect();

        let mut tx = self.pool.begin().await?;

        let missing = missing_products(&mut tx, &ids).await?;
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(RepositoryError::UnknownProducts(missing));
        }

        sqlx::query(
            r"
            INSERT INTO shop.cart_line (user_id, product_id, quantity)
            SELECT $1, l.product_id, l.quantity
            FROM UNNEST($2::int4[], $3::int4[]) AS l(product_id, quantity)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = EXCLUDED.quantity, updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(&ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await
        .map_err(|e| unknown_products_on_fk(e, &ids))?;

        tx.commit().await?;

        self.get(user_id).await
    }
}

async fn missing_products(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[ProductId],
) -> Result<Vec<ProductId>, RepositoryError> {
    let found: Vec<(i32,)> = sqlx::query_as("SELECT id FROM shop.product WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

    let mut missing: Vec<ProductId> = ids
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|(f,)| *f == id.as_i32()))
        .collect();
    missing.sort();
    missing.dedup();
    Ok(missing)
}
