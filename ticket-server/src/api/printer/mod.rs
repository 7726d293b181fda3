//! Printer API
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/print/ticket | POST | Print a sale ticket and open the drawer |
//! | /api/print/test | GET | Print the diagnostic page |
//! | /api/print/status | GET | Printer snapshot (`?drawer=true` adds a drawer query) |
//! | /api/print/drawer/open | POST | Pulse the cash drawer |
//! | /api/print/drawer/status | GET | `OPEN`, `CLOSED` or `UNKNOWN` |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/print", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/ticket", post(handler::print_ticket))
        .route("/test", get(handler::print_test))
        .route("/status", get(handler::status))
        .route("/drawer/open", post(handler::open_drawer))
        .route("/drawer/status", get(handler::drawer_status))
}
