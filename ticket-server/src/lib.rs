//! # ticket-server
//!
//! HTTP front end for the receipt printer.
//!
//! ## Modules
//!
//! - [`api`] - routes
//! - [`config`] - environment configuration
//! - [`error`] - error responses
//! - [`logger`] - tracing setup
//! - [`state`] - shared handler state

pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod state;

pub use api::build_router;
pub use config::Config;
pub use error::{AppError, AppResult, PrintResponse};
pub use logger::init_logger_with_file;
pub use state::AppState;
