//! Error handling
//!
//! Every print endpoint answers with a [`PrintResponse`]; failures carry
//! `success: false` and a status code picked by [`AppError`].
//!
//! | Error | Status |
//! |-------|--------|
//! | Validation | 400 |
//! | PrinterUnavailable | 503 |
//! | PrintFailed | 500 |

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ticket_printer::PrintError;
use tracing::{error, warn};
use validator::ValidationErrors;

/// Body of every print endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintResponse {
    pub success: bool,
    pub message: String,
}

impl PrintResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Datos inválidos: {0}")]
    /// Bad request payload (400)
    Validation(String),

    #[error("Impresora no disponible: {0}")]
    /// No printer to talk to (503)
    PrinterUnavailable(String),

    #[error("Error al imprimir: {0}")]
    /// Device or spooler failure (500)
    PrintFailed(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(msg) => {
                warn!(error = %msg, "Rejected request");
                StatusCode::BAD_REQUEST
            }
            AppError::PrinterUnavailable(msg) => {
                error!(error = %msg, "Printer unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::PrintFailed(msg) => {
                error!(error = %msg, "Print failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(PrintResponse::failure(self.to_string()))).into_response()
    }
}

impl From<PrintError> for AppError {
    fn from(e: PrintError) -> Self {
        match e {
            PrintError::DeviceNotFound(_) => AppError::PrinterUnavailable(e.to_string()),
            // Only caller data (QR payload) fails to encode
            PrintError::Encoding(_) => AppError::Validation(e.to_string()),
            _ => AppError::PrintFailed(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
