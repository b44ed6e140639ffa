//! Stockroom storefront library.
//!
//! Inventory-consistent fulfillment: advisory feasibility checks, per-user
//! server carts, all-or-nothing order commits against the stock ledger, and
//! compensating stock restoration driven by payment callbacks.
//!
//! The binary in `main.rs` wires this up over `PostgreSQL`; tests build the
//! same router over [`store::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use state::AppState;

/// Build the storefront router with its request-scoped middleware.
#[must_use]
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    with_middleware(routes::routes(), state, sessions)
}

/// Apply state and middleware to an arbitrary route set.
///
/// Lets callers mount extra routes (an identity service's login endpoint,
/// for instance) that share the storefront session.
#[must_use]
pub fn with_middleware<S>(
    routes: Router<AppState>,
    state: AppState,
    sessions: SessionManagerLayer<S>,
) -> Router
where
    S: SessionStore + Clone,
{
    routes
        .with_state(state)
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(sessions)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
}
