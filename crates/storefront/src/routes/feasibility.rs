//! Feasibility route.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_core::{FeasibilityResult, LineRequest};

use crate::error::Result;
use crate::services::FeasibilityChecker;
use crate::state::AppState;

/// Lines to check.
#[derive(Debug, Deserialize)]
pub struct FeasibilityRequest {
    pub lines: Vec<LineRequest>,
}

/// One result per requested line, in request order.
#[derive(Debug, Serialize)]
pub struct FeasibilityResponse {
    pub results: Vec<FeasibilityResult>,
}

/// POST /api/feasibility
///
/// Advisory: available to anonymous shoppers, never reserves stock.
///
/// # Errors
///
/// Returns 422 for oversized requests and 503 if the ledger is unreachable.
#[instrument(skip(state, request))]
pub async fn check(
    State(state): State<AppState>,
    Json(request): Json<FeasibilityRequest>,
) -> Result<Json<FeasibilityResponse>> {
    let results = FeasibilityChecker::new(state.fulfillment())
        .check(&request.lines)
        .await?;
    Ok(Json(FeasibilityResponse { results }))
}
