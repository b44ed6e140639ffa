//! In-memory stores with the same atomicity as the `PostgreSQL` ones.
//!
//! All state sits behind one async mutex, so each trait call is a single
//! critical section: a commit validates and decrements under the same lock
//! that later restorations take.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use stockroom_core::{
    Cart, CartLine, FeasibilityResult, LineRequest, OrderId, OrderLine, OrderReceipt, OrderStatus,
    OrderView, Price, Product, ProductId, Quantity, StatusEntry, StockLevel, UserId,
};

use super::{CartRepository, CommitOutcome, FulfillmentStore, NewOrder, PaymentRecord, Restoration};
use crate::db::RepositoryError;
use crate::db::products::NewProduct;

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderView>,
    carts: HashMap<UserId, BTreeMap<ProductId, LineRequest>>,
    next_product_id: i32,
    next_order_id: i32,
}

impl State {
    fn record(order: &mut OrderView, status: OrderStatus) {
        order.history.push(StatusEntry {
            status,
            recorded_at: Utc::now(),
        });
    }

    fn cart(&self, user_id: UserId) -> Cart {
        self.carts
            .get(&user_id)
            .into_iter()
            .flat_map(BTreeMap::values)
            .map(|line| {
                let cart_line = CartLine::new(line.product_id, line.quantity);
                match self.products.get(&line.product_id) {
                    Some(product) => cart_line.with_snapshot(product.snapshot()),
                    None => cart_line,
                }
            })
            .collect()
    }

    fn missing(&self, lines: &[LineRequest]) -> Vec<ProductId> {
        let mut missing: Vec<ProductId> = lines
            .iter()
            .map(|l| l.product_id)
            .filter(|id| !self.products.contains_key(id))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// Shared in-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog product and return it with its assigned id.
    pub async fn insert_product(&self, input: NewProduct) -> Product {
        let mut state = self.state.lock().await;
        state.next_product_id += 1;
        let product = Product {
            id: ProductId::new(state.next_product_id),
            title: input.title,
            price: input.price,
            image_url: input.image_url,
            quantity_in_stock: input.quantity_in_stock,
            max_order_quantity: input.max_order_quantity,
        };
        state.products.insert(product.id, product.clone());
        product
    }

    /// Overwrite a product's stock, as an out-of-band restock would.
    pub async fn set_stock(&self, id: ProductId, quantity_in_stock: i32) {
        if let Some(product) = self.state.lock().await.products.get_mut(&id) {
            product.quantity_in_stock = quantity_in_stock;
        }
    }

    /// Remove a product from the catalog along with any cart lines for it.
    pub async fn remove_product(&self, id: ProductId) {
        let mut state = self.state.lock().await;
        state.products.remove(&id);
        for cart in state.carts.values_mut() {
            cart.remove(&id);
        }
    }

    /// Number of orders ever committed.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl FulfillmentStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn stock_levels(&self, ids: &[ProductId]) -> Result<Vec<StockLevel>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .map(Product::stock_level)
            .collect())
    }

    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, RepositoryError> {
        let mut state = self.state.lock().await;

        let rejected: Vec<FeasibilityResult> = order
            .lines
            .iter()
            .map(|line| {
                let level = state.products.get(&line.product_id).map(Product::stock_level);
                FeasibilityResult::evaluate(line.product_id, line.quantity, level.as_ref())
            })
            .filter(|r| !r.can_be_ordered)
            .collect();
        if !rejected.is_empty() {
            return Ok(CommitOutcome::Rejected(rejected));
        }

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = state
                .products
                .get_mut(&line.product_id)
                .ok_or(RepositoryError::NotFound)?;
            product.quantity_in_stock -= line.quantity.get();
            lines.push(OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }
        lines.sort_by_key(|l| l.product_id);

        state.next_order_id += 1;
        let id = OrderId::new(state.next_order_id);
        let mut view = OrderView {
            id,
            user_id: order.user_id,
            recipient: order.recipient.clone(),
            payment_method: order.payment_method,
            is_paid: false,
            created_at: Utc::now(),
            stock_restored_at: None,
            lines,
            history: Vec::new(),
        };
        State::record(&mut view, OrderStatus::Placed);
        let total: Price = view.total();
        state.orders.insert(id, view);

        Ok(CommitOutcome::Committed(OrderReceipt {
            order_id: id,
            total,
            status: OrderStatus::Placed,
        }))
    }

    async fn restore_stock(
        &self,
        order_id: OrderId,
        reason: Option<OrderStatus>,
    ) -> Result<Restoration, RepositoryError> {
        let mut state = self.state.lock().await;
        let State {
            products, orders, ..
        } = &mut *state;

        let Some(order) = orders.get_mut(&order_id) else {
            return Ok(Restoration::OrderNotFound);
        };
        if order.is_paid {
            return Ok(Restoration::OrderPaid);
        }
        if order.stock_restored_at.is_some() {
            return Ok(Restoration::AlreadyRestored);
        }

        // Same as the join in Postgres: only lines whose product still exists
        // are restored, and nothing is claimed when none do.
        let restored: Vec<(ProductId, Quantity)> = order
            .lines
            .iter()
            .filter(|line| products.contains_key(&line.product_id))
            .map(|line| (line.product_id, line.quantity))
            .collect();
        if restored.is_empty() {
            return Ok(Restoration::NoLines);
        }
        for (product_id, quantity) in &restored {
            if let Some(product) = products.get_mut(product_id) {
                product.quantity_in_stock += quantity.get();
            }
        }

        order.stock_restored_at = Some(Utc::now());
        if let Some(reason) = reason {
            State::record(order, reason);
        }
        State::record(order, OrderStatus::StockRestored);

        Ok(Restoration::Restored { lines: restored })
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<PaymentRecord, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Ok(PaymentRecord::OrderNotFound);
        };
        if order.stock_restored_at.is_some() {
            return Ok(PaymentRecord::StockAlreadyRestored);
        }
        if order.is_paid {
            return Ok(PaymentRecord::AlreadyPaid);
        }
        order.is_paid = true;
        State::record(order, OrderStatus::Paid);
        Ok(PaymentRecord::Marked)
    }

    async fn order(&self, order_id: OrderId) -> Result<Option<OrderView>, RepositoryError> {
        Ok(self.state.lock().await.orders.get(&order_id).cloned())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        Ok(self.state.lock().await.cart(user_id))
    }

    async fn upsert(&self, user_id: UserId, line: LineRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let missing = state.missing(&[line]);
        if !missing.is_empty() {
            return Err(RepositoryError::UnknownProducts(missing));
        }
        state
            .carts
            .entry(user_id)
            .or_default()
            .insert(line.product_id, line);
        Ok(())
    }

    async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state
            .carts
            .get_mut(&user_id)
            .is_some_and(|cart| cart.remove(&product_id).is_some()))
    }

    async fn merge(&self, user_id: UserId, lines: &[LineRequest]) -> Result<Cart, RepositoryError> {
        let mut state = self.state.lock().await;
        let missing = state.missing(lines);
        if !missing.is_empty() {
            return Err(RepositoryError::UnknownProducts(missing));
        }
        let cart = state.carts.entry(user_id).or_default();
        for line in lines {
            cart.insert(line.product_id, *line);
        }
        Ok(state.cart(user_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use stockroom_core::{PaymentMethod, Quantity, Recipient};

    use super::*;

    fn widget(stock: i32, max: i32) -> NewProduct {
        NewProduct {
            title: "Widget".to_string(),
            price: Price::new(Decimal::new(250, 2)),
            image_url: None,
            quantity_in_stock: stock,
            max_order_quantity: max,
        }
    }

    fn line(product_id: ProductId, quantity: i32) -> LineRequest {
        LineRequest {
            product_id,
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    fn order(lines: Vec<LineRequest>) -> NewOrder {
        NewOrder {
            user_id: None,
            lines,
            recipient: Recipient {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
                address: "1 Loop Road".to_string(),
            },
            payment_method: PaymentMethod::Online,
        }
    }

    async fn stock_of(store: &MemoryStore, id: ProductId) -> i32 {
        store.product(id).await.unwrap().unwrap().quantity_in_stock
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = store.insert_product(widget(3, 10)).await;
        let b = store.insert_product(widget(10, 10)).await;

        let outcome = store
            .commit_order(&order(vec![line(a.id, 5), line(b.id, 1)]))
            .await
            .unwrap();

        let CommitOutcome::Rejected(results) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].product_id, a.id);
        assert_eq!(stock_of(&store, a.id).await, 3);
        assert_eq!(stock_of(&store, b.id).await, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_restore_returns_exact_quantities_once() {
        let store = MemoryStore::new();
        let a = store.insert_product(widget(10, 10)).await;
        let b = store.insert_product(widget(8, 10)).await;

        let CommitOutcome::Committed(receipt) = store
            .commit_order(&order(vec![line(a.id, 3), line(b.id, 2)]))
            .await
            .unwrap()
        else {
            panic!("expected commit");
        };
        assert_eq!(receipt.total, Price::new(Decimal::new(1250, 2)));

        // Unrelated restock between commit and restoration.
        store.set_stock(a.id, 20).await;

        let first = store
            .restore_stock(receipt.order_id, Some(OrderStatus::PaymentFailed))
            .await
            .unwrap();
        assert!(matches!(first, Restoration::Restored { .. }));
        assert_eq!(stock_of(&store, a.id).await, 23);
        assert_eq!(stock_of(&store, b.id).await, 8);

        let second = store.restore_stock(receipt.order_id, None).await.unwrap();
        assert_eq!(second, Restoration::AlreadyRestored);
        assert_eq!(stock_of(&store, a.id).await, 23);

        let view = store.order(receipt.order_id).await.unwrap().unwrap();
        let statuses: Vec<_> = view.history.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Placed,
                OrderStatus::PaymentFailed,
                OrderStatus::StockRestored
            ]
        );
    }

    #[tokio::test]
    async fn test_paid_order_is_never_restored() {
        let store = MemoryStore::new();
        let a = store.insert_product(widget(5, 5)).await;
        let CommitOutcome::Committed(receipt) =
            store.commit_order(&order(vec![line(a.id, 2)])).await.unwrap()
        else {
            panic!("expected commit");
        };

        assert_eq!(
            store.mark_paid(receipt.order_id).await.unwrap(),
            PaymentRecord::Marked
        );
        assert_eq!(
            store.restore_stock(receipt.order_id, None).await.unwrap(),
            Restoration::OrderPaid
        );
        assert_eq!(stock_of(&store, a.id).await, 3);
    }

    #[tokio::test]
    async fn test_cart_merge_rejects_unknown_products() {
        let store = MemoryStore::new();
        let a = store.insert_product(widget(5, 5)).await;
        let user = UserId::new(1);

        let err = store
            .merge(user, &[line(a.id, 1), line(ProductId::new(99), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UnknownProducts(ids) if ids == vec![ProductId::new(99)]));
        assert!(CartRepository::get(&store, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_products_is_not_claimed() {
        let store = MemoryStore::new();
        let a = store.insert_product(widget(5, 5)).await;
        let CommitOutcome::Committed(receipt) =
            store.commit_order(&order(vec![line(a.id, 2)])).await.unwrap()
        else {
            panic!("expected commit");
        };
        store.remove_product(a.id).await;

        assert_eq!(
            store.restore_stock(receipt.order_id, None).await.unwrap(),
            Restoration::NoLines
        );
        let view = store.order(receipt.order_id).await.unwrap().unwrap();
        assert!(view.stock_restored_at.is_none());
        assert_eq!(view.history.len(), 1);
    }
}
