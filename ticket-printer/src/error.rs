//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// No print service matched the target and the OS has no default
    #[error("Printer not found: {0}")]
    DeviceNotFound(String),

    /// The spooler rejected or failed a submitted job
    #[error("Transmission failed: {0}")]
    Transmission(String),

    /// Command could not be encoded (e.g. QR payload too long)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Blocking print task could not be joined
    #[error("Print task failed: {0}")]
    Task(String),
}

impl PrintError {
    /// Whether the current session should be dropped and rebuilt on next use
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Self::Transmission(_) | Self::Io(_))
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
