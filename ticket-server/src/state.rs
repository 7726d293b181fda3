use std::time::Duration;

use ticket_printer::{PrintResult, PrinterManager};

use crate::Config;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub printer: PrinterManager,
    /// Outer bound for drawer status requests
    pub drawer_status_deadline: Duration,
}

impl AppState {
    pub fn new(printer: PrinterManager, drawer_status_deadline: Duration) -> Self {
        Self {
            printer,
            drawer_status_deadline,
        }
    }

    /// Build the configured backend and start the printer
    ///
    /// Fails only on invalid printer configuration; a missing printer is
    /// not an error at startup.
    pub async fn initialize(config: &Config) -> PrintResult<Self> {
        let registry = config.printer.registry()?;
        let printer = PrinterManager::start(&config.printer, registry).await;
        Ok(Self::new(printer, config.drawer_status_deadline()))
    }
}
