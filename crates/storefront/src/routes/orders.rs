//! Order routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use tracing::instrument;

use stockroom_core::{CreateOrderRequest, OrderId, OrderReceipt, OrderView};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalUser;
use crate::models::session_keys;
use crate::services::OrderCommitter;
use crate::state::AppState;

/// POST /api/orders
///
/// Commits the order against the ledger. Anonymous checkout is allowed and
/// the order is remembered in the placing session; a signed-in shopper's
/// orders are attributed to them.
///
/// # Errors
///
/// - 400 for structurally invalid requests
/// - 409 with fresh feasibility results when stock changed since the check
/// - 503 on transient storage failure (nothing was written)
#[instrument(skip(state, user, session, request), fields(lines = request.lines.len()))]
pub async fn create(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>)> {
    let user_id = user.map(|u| u.id);
    let receipt = OrderCommitter::new(state.fulfillment())
        .commit(user_id, request)
        .await?;

    if user_id.is_none() {
        remember_placed_order(&session, receipt.order_id).await;
    }

    let order_id = receipt.order_id.to_string();
    add_breadcrumb("checkout", "Order committed", Some(&[("order_id", order_id.as_str())]));

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/orders/{id}
///
/// Orders placed while signed in are visible only to their owner, anonymous
/// orders only to the session that placed them. Everyone else gets 404, so
/// sequential order ids reveal nothing.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown or foreign orders.
#[instrument(skip(state, user, session), fields(order_id = %order_id))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let not_found = || AppError::NotFound(format!("order {order_id}"));

    let order = state
        .fulfillment()
        .order(order_id)
        .await?
        .ok_or_else(not_found)?;

    match (order.user_id, user) {
        (Some(owner), Some(user)) if owner == user.id => Ok(Json(order)),
        (Some(_), _) => Err(not_found()),
        (None, _) if placed_in_session(&session, order_id).await => Ok(Json(order)),
        (None, _) => Err(not_found()),
    }
}

async fn placed_orders(session: &Session) -> Vec<OrderId> {
    session
        .get::<Vec<OrderId>>(session_keys::PLACED_ORDERS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn placed_in_session(session: &Session, order_id: OrderId) -> bool {
    placed_orders(session).await.contains(&order_id)
}

/// The order is already committed; failing to remember it only hides it from
/// `show`, so the error is logged rather than returned.
async fn remember_placed_order(session: &Session, order_id: OrderId) {
    let mut placed = placed_orders(session).await;
    placed.push(order_id);
    if let Err(e) = session.insert(session_keys::PLACED_ORDERS, placed).await {
        tracing::warn!(error = %e, %order_id, "Could not remember anonymous order");
    }
}
