//! Cash drawer status
//!
//! Sends `DLE EOT 1` and waits a bounded time for the one-byte reply.
//! Many transports are one-way, so an unanswered query is a normal
//! outcome and maps to [`DrawerStatus::Unknown`] rather than an error.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::connector::DeviceConnector;
use crate::escpos;

/// How long to wait for a status reply
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Pause between checks for reply bytes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drawer-open bit in the printer status byte
const DRAWER_OPEN_BIT: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DrawerStatus {
    Open,
    Closed,
    /// No reply, no reverse channel, or no printer
    Unknown,
}

impl DrawerStatus {
    pub fn from_status_byte(byte: u8) -> Self {
        if byte & DRAWER_OPEN_BIT != 0 {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// `Some(open)` when known
    pub fn as_open_flag(self) -> Option<bool> {
        match self {
            Self::Open => Some(true),
            Self::Closed => Some(false),
            Self::Unknown => None,
        }
    }
}

/// Snapshot reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatus {
    pub connected: bool,
    pub printer_name: String,
    pub printer_port: String,
    /// Paper sensors are not queried; always `true`
    pub has_paper: bool,
    pub drawer_open: Option<bool>,
}

/// Bounded-time drawer status query
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    timeout: Duration,
    poll_interval: Duration,
}

impl StatusPoller {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Ask the printer for its drawer state
    ///
    /// Blocks for at most the configured timeout once the request is out.
    /// Never fails: every problem resolves to [`DrawerStatus::Unknown`].
    #[instrument(skip_all, fields(target = %connector.target()))]
    pub fn query(&self, connector: &mut DeviceConnector) -> DrawerStatus {
        if let Err(e) = connector.connect() {
            warn!(error = %e, "Cannot query drawer status: printer unavailable");
            return DrawerStatus::Unknown;
        }

        let mut input = match connector.input() {
            Ok(Some(input)) => input,
            Ok(None) => return DrawerStatus::Unknown,
            Err(e) => {
                warn!(error = %e, "Failed to open reverse channel");
                return DrawerStatus::Unknown;
            }
        };

        // Stale bytes would be mistaken for the reply
        match input.available() {
            Ok(0) => {}
            Ok(stale) => {
                let skipped = input.skip(stale).unwrap_or(0);
                debug!(skipped, "Discarded stale input");
            }
            Err(e) => {
                warn!(error = %e, "Reverse channel unreadable");
                return DrawerStatus::Unknown;
            }
        }

        let sent = connector.output().and_then(|sink| {
            sink.write(&escpos::status_query())?;
            sink.flush()
        });
        if let Err(e) = sent {
            warn!(error = %e, "Failed to send status request");
            if e.invalidates_session() {
                connector.invalidate();
            }
            return DrawerStatus::Unknown;
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            match input.available() {
                Ok(0) => {}
                Ok(_) => {
                    return match input.read_byte() {
                        Ok(Some(byte)) => {
                            let status = DrawerStatus::from_status_byte(byte);
                            debug!(byte, ?status, "Printer status received");
                            status
                        }
                        Ok(None) => DrawerStatus::Unknown,
                        Err(e) => {
                            warn!(error = %e, "Failed to read status reply");
                            DrawerStatus::Unknown
                        }
                    };
                }
                Err(e) => {
                    warn!(error = %e, "Failed to poll reverse channel");
                    return DrawerStatus::Unknown;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "No status reply from printer");
                return DrawerStatus::Unknown;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryPrinter, MemoryRegistry};
    use std::sync::Arc;

    fn connector_with(printer: Arc<MemoryPrinter>) -> DeviceConnector {
        DeviceConnector::new("DIG", Arc::new(MemoryRegistry::new().with_service(printer)))
            .with_settle_delay(Duration::ZERO)
    }

    fn fast_poller() -> StatusPoller {
        StatusPoller::new(Duration::from_millis(200), Duration::from_millis(10))
    }

    #[test]
    fn test_from_status_byte() {
        assert_eq!(DrawerStatus::from_status_byte(0x16), DrawerStatus::Open);
        assert_eq!(DrawerStatus::from_status_byte(0x04), DrawerStatus::Open);
        assert_eq!(DrawerStatus::from_status_byte(0x12), DrawerStatus::Closed);
        assert_eq!(DrawerStatus::from_status_byte(0x00), DrawerStatus::Closed);
    }

    #[test]
    fn test_serialize_uppercase() {
        assert_eq!(serde_json::to_string(&DrawerStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(
            serde_json::to_string(&DrawerStatus::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }

    #[test]
    fn test_printer_status_camel_case() {
        let status = PrinterStatus {
            connected: true,
            printer_name: "DIG-58iiA".to_string(),
            printer_port: "COM1".to_string(),
            has_paper: true,
            drawer_open: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["printerName"], "DIG-58iiA");
        assert_eq!(json["hasPaper"], true);
        assert!(json["drawerOpen"].is_null());
    }

    #[test]
    fn test_query_open_and_closed() {
        let open = Arc::new(MemoryPrinter::new("DIG-58iiA").with_status_reply(0x16));
        let mut connector = connector_with(open.clone());
        assert_eq!(fast_poller().query(&mut connector), DrawerStatus::Open);
        assert_eq!(open.jobs(), vec![escpos::status_query()]);

        let closed = Arc::new(MemoryPrinter::new("DIG-58iiA").with_status_reply(0x12));
        let mut connector = connector_with(closed);
        assert_eq!(fast_poller().query(&mut connector), DrawerStatus::Closed);
    }

    #[test]
    fn test_query_discards_stale_input() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA").with_status_reply(0x12));
        printer.push_inbound(&[0xFF, 0xFF]);
        let mut connector = connector_with(printer);

        assert_eq!(fast_poller().query(&mut connector), DrawerStatus::Closed);
    }

    #[test]
    fn test_query_one_way_transport() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector = connector_with(printer.clone());
        let poller = StatusPoller::new(Duration::from_secs(5), Duration::from_millis(10));

        let start = Instant::now();
        assert_eq!(poller.query(&mut connector), DrawerStatus::Unknown);
        // returns at once instead of waiting out the reply timeout
        assert!(start.elapsed() < Duration::from_secs(1));
        // no request is sent without a way to read the answer
        assert!(printer.jobs().is_empty());
    }

    #[test]
    fn test_query_times_out() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA").with_silent_channel());
        let mut connector = connector_with(printer);
        let poller = StatusPoller::new(Duration::from_millis(100), Duration::from_millis(10));

        let start = Instant::now();
        assert_eq!(poller.query(&mut connector), DrawerStatus::Unknown);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(1000));
    }

    #[test]
    fn test_query_without_printer() {
        let mut connector = DeviceConnector::new("DIG", Arc::new(MemoryRegistry::new()));
        assert_eq!(fast_poller().query(&mut connector), DrawerStatus::Unknown);
    }

    #[test]
    fn test_query_send_failure_invalidates() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA").with_status_reply(0x16));
        printer.set_failing(true);
        let mut connector = connector_with(printer);

        assert_eq!(fast_poller().query(&mut connector), DrawerStatus::Unknown);
        assert!(!connector.is_connected());
    }
}
