//! Server cart routes.
//!
//! Only signed-in shoppers have a server cart; anonymous shoppers keep a
//! local cart on the client and sync it here after login.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use stockroom_core::{Cart, LineRequest, ProductId, Quantity};

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::services::CartService;
use crate::state::AppState;

/// Body of a line upsert.
#[derive(Debug, Deserialize)]
pub struct UpsertLineRequest {
    pub quantity: Quantity,
}

/// Local cart lines to merge.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub lines: Vec<LineRequest>,
}

/// GET /api/cart
///
/// # Errors
///
/// Returns 503 if the cart cannot be read.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.carts()).get(user.id).await?;
    Ok(Json(cart))
}

/// PUT /api/cart/lines/{product_id}
///
/// Replaces the line quantity; repeating the same request is a no-op.
///
/// # Errors
///
/// Returns 422 if the product does not exist.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn upsert_line(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpsertLineRequest>,
) -> Result<StatusCode> {
    CartService::new(state.carts())
        .upsert(
            user.id,
            LineRequest {
                product_id,
                quantity: body.quantity,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/cart/lines/{product_id}
///
/// # Errors
///
/// Returns 503 if the cart cannot be written.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_line(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    CartService::new(state.carts())
        .delete(user.id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/cart/sync
///
/// Idempotent merge of a local cart into the server cart. Returns the merged
/// cart. A 422 tells the client its local cart is unusable and should be
/// discarded.
///
/// # Errors
///
/// Returns 422 for unknown or duplicate products, 503 on storage failure.
#[instrument(skip(state, user, body), fields(user_id = %user.id, lines = body.lines.len()))]
pub async fn sync(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<SyncRequest>,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.carts())
        .synchronize(user.id, &body.lines)
        .await?;
    Ok(Json(cart))
}
