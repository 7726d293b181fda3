//! API routes
//!
//! - [`health`] - liveness and printer connection
//! - [`printer`] - ticket printing and cash drawer

pub mod health;
pub mod printer;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Assemble all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(printer::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
