//! Order commit, stock restoration and payment recording.
//!
//! Every ledger write in the service happens here, inside a transaction:
//!
//! - [`OrderRepository::commit`] decrements stock for all lines or none.
//! - [`OrderRepository::restore`] adds an order's lines back exactly once.
//!
//! Product rows are always locked in ascending id order so concurrent commits
//! and restorations cannot deadlock against each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use stockroom_core::{
    FeasibilityResult, OrderId, OrderLine, OrderReceipt, OrderStatus, OrderView, PaymentMethod,
    Price, ProductId, Quantity, Recipient, StatusEntry, StockLevel, UserId,
};

use super::RepositoryError;
use crate::store::{CommitOutcome, NewOrder, PaymentRecord, Restoration};

#[derive(Debug, sqlx::FromRow)]
struct LockedLevelRow {
    id: i32,
    quantity_in_stock: i32,
    max_order_quantity: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct DecrementedRow {
    id: i32,
    quantity: i32,
    price: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderStateRow {
    is_paid: bool,
    stock_restored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct RestoredRow {
    product_id: i32,
    quantity: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    recipient: Json<Recipient>,
    payment_method: PaymentMethod,
    is_paid: bool,
    created_at: DateTime<Utc>,
    stock_restored_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: i32,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    status: OrderStatus,
    recorded_at: DateTime<Utc>,
}

fn quantity(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::try_from(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("stored quantity: {e}")))
}

/// Repository for order lifecycle writes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate and decrement every line, then persist the order.
    ///
    /// Product rows are locked (`FOR UPDATE`, ordered by id) and re-evaluated
    /// under the lock. If any line fails, the transaction is rolled back and
    /// the offending results are returned; otherwise one set-based `UPDATE`
    /// decrements all rows, guarded by the same predicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction is rolled back and the ledger is untouched.
    #[instrument(skip(self, order), fields(lines = order.lines.len()))]
    pub async fn commit(&self, order: &NewOrder) -> Result<CommitOutcome, RepositoryError> {
        let ids: Vec<i32> = order.lines.iter().map(|l| l.product_id.as_i32()).collect();
        let quantities: Vec<i32> = order.lines.iter().map(|l| l.quantity.get()).collect();

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, LockedLevelRow>(
            r"
            SELECT id, quantity_in_stock, max_order_quantity
            FROM shop.product
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let levels: Vec<StockLevel> = locked
            .into_iter()
            .map(|row| StockLevel {
                product_id: ProductId::new(row.id),
                quantity_in_stock: row.quantity_in_stock,
                max_order_quantity: row.max_order_quantity,
            })
            .collect();

        let rejected: Vec<FeasibilityResult> = order
            .lines
            .iter()
            .map(|line| {
                let level = levels.iter().find(|l| l.product_id == line.product_id);
                FeasibilityResult::evaluate(line.product_id, line.quantity, level)
            })
            .filter(|r| !r.can_be_ordered)
            .collect();

        if !rejected.is_empty() {
            tx.rollback().await?;
            return Ok(CommitOutcome::Rejected(rejected));
        }

        let decremented = sqlx::query_as::<_, DecrementedRow>(
            r"
            UPDATE shop.product p
            SET quantity_in_stock = p.quantity_in_stock - req.quantity,
                updated_at = NOW()
            FROM UNNEST($1::int4[], $2::int4[]) AS req(product_id, quantity)
            WHERE p.id = req.product_id
              AND p.quantity_in_stock >= req.quantity
              AND p.max_order_quantity >= req.quantity
            RETURNING p.id, req.quantity, p.price
            ",
        )
        .bind(&ids)
        .bind(&quantities)
        .fetch_all(&mut *tx)
        .await?;

        if decremented.len() != order.lines.len() {
            tx.rollback().await?;
            return Err(RepositoryError::DataCorruption(format!(
                "decremented {} of {} locked rows",
                decremented.len(),
                order.lines.len()
            )));
        }

        let (order_id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO shop.customer_order (user_id, recipient, payment_method)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(order.user_id)
        .bind(Json(&order.recipient))
        .bind(order.payment_method)
        .fetch_one(&mut *tx)
        .await?;

        let line_ids: Vec<i32> = decremented.iter().map(|r| r.id).collect();
        let line_quantities: Vec<i32> = decremented.iter().map(|r| r.quantity).collect();
        let line_prices: Vec<Decimal> = decremented.iter().map(|r| r.price).collect();

        sqlx::query(
            r"
            INSERT INTO shop.order_line (order_id, product_id, quantity, unit_price)
            SELECT $1, l.product_id, l.quantity, l.unit_price
            FROM UNNEST($2::int4[], $3::int4[], $4::numeric[]) AS l(product_id, quantity, unit_price)
            ",
        )
        .bind(order_id)
        .bind(&line_ids)
        .bind(&line_quantities)
        .bind(&line_prices)
        .execute(&mut *tx)
        .await?;

        append_status(&mut tx, order_id, OrderStatus::Placed).await?;

        tx.commit().await?;

        let total = decremented
            .iter()
            .map(|r| Ok(Price::new(r.price).line_total(quantity(r.quantity)?)))
            .sum::<Result<Price, RepositoryError>>()?;

        Ok(CommitOutcome::Committed(OrderReceipt {
            order_id: OrderId::new(order_id),
            total,
            status: OrderStatus::Placed,
        }))
    }

    /// Add an order's lines back to the ledger, at most once.
    ///
    /// The order row is locked first; paid or already-restored orders are left
    /// alone. The increment and the `stock_restored_at` claim commit together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// written in that case.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn restore(
        &self,
        order_id: OrderId,
        reason: Option<OrderStatus>,
    ) -> Result<Restoration, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(state) = lock_order(&mut tx, order_id).await? else {
            tx.rollback().await?;
            return Ok(Restoration::OrderNotFound);
        };
        if state.is_paid {
            tx.rollback().await?;
            return Ok(Restoration::OrderPaid);
        }
        if state.stock_restored_at.is_some() {
            tx.rollback().await?;
            return Ok(Restoration::AlreadyRestored);
        }

        sqlx::query(
            r"
            SELECT p.id
            FROM shop.product p
            JOIN shop.order_line l ON l.product_id = p.id
            WHERE l.order_id = $1
            ORDER BY p.id
            FOR UPDATE OF p
            ",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        let restored = sqlx::query_as::<_, RestoredRow>(
            r"
            UPDATE shop.product p
            SET quantity_in_stock = p.quantity_in_stock + l.quantity,
                updated_at = NOW()
            FROM shop.order_line l
            WHERE l.order_id = $1 AND p.id = l.product_id
            RETURNING l.product_id, l.quantity
            ",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        if restored.is_empty() {
            tx.rollback().await?;
            return Ok(Restoration::NoLines);
        }

        let claimed = sqlx::query(
            r"
            UPDATE shop.customer_order
            SET stock_restored_at = NOW()
            WHERE id = $1 AND stock_restored_at IS NULL AND NOT is_paid
            ",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(Restoration::AlreadyRestored);
        }

        if let Some(reason) = reason {
            append_status(&mut tx, order_id.as_i32(), reason).await?;
        }
        append_status(&mut tx, order_id.as_i32(), OrderStatus::StockRestored).await?;

        tx.commit().await?;

        let mut lines = restored
            .into_iter()
            .map(|r| Ok((ProductId::new(r.product_id), quantity(r.quantity)?)))
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        lines.sort_by_key(|(id, _)| *id);

        Ok(Restoration::Restored { lines })
    }

    /// Record a successful payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<PaymentRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(state) = lock_order(&mut tx, order_id).await? else {
            tx.rollback().await?;
            return Ok(PaymentRecord::OrderNotFound);
        };
        if state.stock_restored_at.is_some() {
            tx.rollback().await?;
            return Ok(PaymentRecord::StockAlreadyRestored);
        }
        if state.is_paid {
            tx.rollback().await?;
            return Ok(PaymentRecord::AlreadyPaid);
        }

        sqlx::query("UPDATE shop.customer_order SET is_paid = TRUE WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        append_status(&mut tx, order_id.as_i32(), OrderStatus::Paid).await?;

        tx.commit().await?;
        Ok(PaymentRecord::Marked)
    }

    /// Get an order with its lines and status history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails, or
    /// `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn get(&self, order_id: OrderId) -> Result<Option<OrderView>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, recipient, payment_method, is_paid, created_at, stock_restored_at
            FROM shop.customer_order
            WHERE id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT product_id, quantity, unit_price
            FROM shop.order_line
            WHERE order_id = $1
            ORDER BY product_id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        let history = sqlx::query_as::<_, StatusRow>(
            r"
            SELECT status, recorded_at
            FROM shop.order_status
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        let lines = lines
            .into_iter()
            .map(|row| {
                Ok(OrderLine {
                    product_id: ProductId::new(row.product_id),
                    quantity: quantity(row.quantity)?,
                    unit_price: Price::new(row.unit_price),
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(OrderView {
            id: OrderId::new(order.id),
            user_id: order.user_id.map(UserId::new),
            recipient: order.recipient.0,
            payment_method: order.payment_method,
            is_paid: order.is_paid,
            created_at: order.created_at,
            stock_restored_at: order.stock_restored_at,
            lines,
            history: history
                .into_iter()
                .map(|row| StatusEntry {
                    status: row.status,
                    recorded_at: row.recorded_at,
                })
                .collect(),
        }))
    }
}

async fn lock_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
) -> Result<Option<OrderStateRow>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderStateRow>(
        r"
        SELECT is_paid, stock_restored_at
        FROM shop.customer_order
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

async fn append_status(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO shop.order_status (order_id, status) VALUES ($1, $2)")
        .bind(order_id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
