use std::time::Duration;

use ticket_printer::{BackendKind, PrinterConfig};

/// Server configuration
///
/// # Environment
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | HTTP_PORT | 8080 | HTTP listen port |
/// | PRINTER_NAME | DIG-58iiA | Printer to bind (substring match) |
/// | PRINTER_PORT | COM1 | Port label; `host[:port]` for the network backend |
/// | PRINTER_BACKEND | spooler | `spooler`, `network` or `memory` |
/// | PRINTER_LINE_WIDTH | 32 | Characters per line |
/// | PRINTER_FEED_LINES | 13 | Lines fed before the cut |
/// | PRINTER_FOOTER | GRACIAS POR SU COMPRA | Ticket footer |
/// | PRINTER_SETTLE_DELAY_MS | 500 | Pause after each job |
/// | PRINTER_STATUS_TIMEOUT_MS | 1000 | Drawer status reply timeout |
/// | LOG_LEVEL | info | trace, debug, info, warn, error |
/// | LOG_DIR | (unset) | Daily log files go here when set |
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub printer: PrinterConfig,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = PrinterConfig::default();

        let printer = PrinterConfig {
            name: std::env::var("PRINTER_NAME").unwrap_or(defaults.name),
            port: std::env::var("PRINTER_PORT").unwrap_or(defaults.port),
            backend: env_parse::<BackendKind>("PRINTER_BACKEND").unwrap_or(defaults.backend),
            line_width: env_parse("PRINTER_LINE_WIDTH").unwrap_or(defaults.line_width),
            feed_lines: env_parse("PRINTER_FEED_LINES").unwrap_or(defaults.feed_lines),
            footer: std::env::var("PRINTER_FOOTER").unwrap_or(defaults.footer),
            settle_delay: env_parse("PRINTER_SETTLE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            status_timeout: env_parse("PRINTER_STATUS_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.status_timeout),
            ..defaults
        };

        Self {
            http_port: env_parse("HTTP_PORT").unwrap_or(8080),
            printer,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|dir| !dir.is_empty()),
        }
    }

    /// Outer bound for a drawer status request
    ///
    /// Covers the job settle delay and the reply timeout, plus slack for
    /// waiting on the device lock.
    pub fn drawer_status_deadline(&self) -> Duration {
        self.printer.settle_delay + self.printer.status_timeout + Duration::from_secs(2)
    }
}
