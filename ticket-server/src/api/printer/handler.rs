//! Printer API Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use ticket_printer::{DrawerStatus, PrinterStatus, Ticket};
use tracing::{info, warn};
use validator::Validate;

use crate::AppState;
use crate::error::{AppResult, PrintResponse};

/// POST /api/print/ticket
pub async fn print_ticket(
    State(state): State<AppState>,
    payload: Result<Json<Ticket>, JsonRejection>,
) -> AppResult<Json<PrintResponse>> {
    let Json(ticket) = payload?;
    ticket.validate()?;

    info!(ticket = %ticket.ticket_number, items = ticket.items.len(), "Print ticket requested");
    state.printer.print_ticket(&ticket).await?;
    Ok(PrintResponse::ok("Ticket impreso correctamente"))
}

/// GET /api/print/test
pub async fn print_test(State(state): State<AppState>) -> AppResult<Json<PrintResponse>> {
    state.printer.print_test_page().await?;
    Ok(PrintResponse::ok("Ticket de prueba impreso correctamente"))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Also query the drawer sensor
    #[serde(default)]
    drawer: bool,
}

/// GET /api/print/status
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Json<PrinterStatus> {
    let drawer_open = if query.drawer {
        drawer_within_deadline(&state).await.as_open_flag()
    } else {
        None
    };
    Json(state.printer.snapshot(drawer_open))
}

/// POST /api/print/drawer/open
pub async fn open_drawer(State(state): State<AppState>) -> AppResult<Json<PrintResponse>> {
    state.printer.open_cash_drawer().await?;
    Ok(PrintResponse::ok("Cajón monedero abierto correctamente"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DrawerStatusResponse {
    pub status: DrawerStatus,
}

/// GET /api/print/drawer/status
pub async fn drawer_status(State(state): State<AppState>) -> Json<DrawerStatusResponse> {
    Json(DrawerStatusResponse {
        status: drawer_within_deadline(&state).await,
    })
}

/// Drawer query bounded by the request deadline
///
/// The blocking query keeps running after the deadline; the response does not wait for it.
async fn drawer_within_deadline(state: &AppState) -> DrawerStatus {
    tokio::time::timeout(state.drawer_status_deadline, state.printer.drawer_status())
        .await
        .unwrap_or_else(|_| {
            warn!(
                deadline_ms = state.drawer_status_deadline.as_millis() as u64,
                "Drawer status request timed out"
            );
            DrawerStatus::Unknown
        })
}
