//! Catalog read.

use axum::{
    Json,
    extract::{Path, State},
};

use stockroom_core::{Product, ProductId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// GET /api/products/{id}
///
/// Display data for local cart snapshots, plus the ledger counters.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown products.
pub async fn show(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .fulfillment()
        .product(product_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))
}
