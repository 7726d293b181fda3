//! Printer configuration

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::memory::{MemoryPrinter, MemoryRegistry};
use crate::backend::network::{NetworkPrinter, NetworkRegistry};
use crate::connector::{DEFAULT_SETTLE_DELAY, SINK_CAPACITY, ServiceRegistry};
use crate::error::{PrintError, PrintResult};
use crate::renderer::{DEFAULT_FEED_LINES, DEFAULT_FOOTER, DEFAULT_WIDTH};
use crate::status::{DEFAULT_POLL_INTERVAL, DEFAULT_STATUS_TIMEOUT};

/// Where print jobs go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// OS print spooler (Win32 or CUPS)
    #[default]
    Spooler,
    /// Raw TCP printer at `port` (`host[:port]`)
    Network,
    /// Virtual printer that records jobs
    Memory,
}

impl FromStr for BackendKind {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spooler" | "system" => Ok(Self::Spooler),
            "network" | "tcp" => Ok(Self::Network),
            "memory" | "dry-run" => Ok(Self::Memory),
            other => Err(PrintError::InvalidConfig(format!(
                "unknown printer backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Spooler => "spooler",
            Self::Network => "network",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Everything needed to bind to and drive one printer
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    /// Target printer name, matched as a case-insensitive substring
    pub name: String,
    /// Port label; the address for the network backend
    pub port: String,
    pub backend: BackendKind,
    /// Characters per line
    pub line_width: usize,
    /// Blank lines fed before the cut
    pub feed_lines: u8,
    pub footer: String,
    /// Pause after each submitted job
    pub settle_delay: Duration,
    /// How long to wait for a status reply
    pub status_timeout: Duration,
    pub poll_interval: Duration,
    pub buffer_capacity: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "DIG-58iiA".to_string(),
            port: "COM1".to_string(),
            backend: BackendKind::Spooler,
            line_width: DEFAULT_WIDTH,
            feed_lines: DEFAULT_FEED_LINES,
            footer: DEFAULT_FOOTER.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_capacity: SINK_CAPACITY,
        }
    }
}

impl PrinterConfig {
    /// Build the service registry for the configured backend
    pub fn registry(&self) -> PrintResult<Arc<dyn ServiceRegistry>> {
        match self.backend {
            BackendKind::Spooler => Ok(crate::backend::system_spooler()),
            BackendKind::Network => {
                let printer = NetworkPrinter::from_addr(&self.port)?;
                Ok(Arc::new(NetworkRegistry::new(printer)))
            }
            BackendKind::Memory => {
                let printer = Arc::new(MemoryPrinter::new(self.name.clone()));
                Ok(Arc::new(
                    MemoryRegistry::new()
                        .with_service(printer.clone())
                        .with_default(printer),
                ))
            }
        }
    }
}
