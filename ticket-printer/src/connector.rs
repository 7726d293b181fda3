//! Device session management
//!
//! A [`DeviceConnector`] binds to one print service picked from a
//! [`ServiceRegistry`] and owns the buffered [`SpoolSink`] in front of it.
//! The reverse channel ([`ByteSource`]) is optional: most spooler
//! transports only carry bytes towards the printer.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Sink buffer size before a forced flush
pub const SINK_CAPACITY: usize = 8192;

/// Pause after each submitted job so slow hardware can catch up
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// A print destination that accepts RAW jobs
pub trait PrintService: Send + Sync {
    /// Name as registered with the OS
    fn name(&self) -> &str;

    /// Submit bytes as one print job
    fn submit_job(&self, data: &[u8]) -> PrintResult<()>;

    /// Open the printer-to-host channel, if the transport has one
    fn reverse_channel(&self) -> PrintResult<Option<Box<dyn ByteSource>>> {
        Ok(None)
    }
}

/// Enumerates print services known to the system
pub trait ServiceRegistry: Send + Sync {
    fn services(&self) -> PrintResult<Vec<Arc<dyn PrintService>>>;

    fn default_service(&self) -> PrintResult<Option<Arc<dyn PrintService>>>;
}

/// Bytes coming back from the printer
pub trait ByteSource: Send {
    /// Bytes that can be read without blocking
    fn available(&mut self) -> io::Result<usize>;

    /// Read one byte, `None` at end of stream
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Discard up to `n` buffered bytes
    fn skip(&mut self, n: usize) -> io::Result<usize> {
        let mut skipped = 0;
        while skipped < n {
            if self.read_byte()?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }
}

/// Case-insensitive substring or exact match against a service name
pub fn matches_target(service_name: &str, target: &str) -> bool {
    service_name.eq_ignore_ascii_case(target)
        || service_name
            .to_lowercase()
            .contains(&target.to_lowercase())
}

/// Fixed-capacity buffer in front of a print service
///
/// Writes accumulate in memory; [`flush`](Self::flush) submits them as a
/// single job. Bytes still buffered when the process dies are lost.
pub struct SpoolSink {
    service: Arc<dyn PrintService>,
    buf: Vec<u8>,
    capacity: usize,
    settle_delay: Duration,
    closed: bool,
}

impl SpoolSink {
    pub fn new(service: Arc<dyn PrintService>, capacity: usize, settle_delay: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            service,
            buf: Vec::with_capacity(capacity),
            capacity,
            settle_delay,
            closed: false,
        }
    }

    /// Buffer bytes, flushing first if they would overflow the buffer
    ///
    /// Blocks larger than the whole buffer are submitted as their own job.
    pub fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        if self.closed {
            return Err(PrintError::Transmission("sink is closed".to_string()));
        }

        if self.buf.len() + data.len() > self.capacity {
            self.flush()?;

            if data.len() > self.capacity {
                return self.submit(data);
            }
        }

        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Submit buffered bytes as one job
    ///
    /// The buffer is emptied even when the job fails; nothing is retried.
    pub fn flush(&mut self) -> PrintResult<()> {
        if self.buf.is_empty() {
            return Ok(());
        }

        let data = std::mem::take(&mut self.buf);
        let result = self.submit(&data);
        self.buf = data;
        self.buf.clear();
        result
    }

    /// Flush and refuse further writes
    pub fn close(&mut self) -> PrintResult<()> {
        let result = self.flush();
        self.closed = true;
        result
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn submit(&self, data: &[u8]) -> PrintResult<()> {
        debug!(printer = self.service.name(), bytes = data.len(), "Submitting print job");
        self.service.submit_job(data)?;

        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
        Ok(())
    }
}

struct Session {
    service: Arc<dyn PrintService>,
    sink: SpoolSink,
}

/// Binds to a named printer and holds the one live session
pub struct DeviceConnector {
    target: String,
    registry: Arc<dyn ServiceRegistry>,
    capacity: usize,
    settle_delay: Duration,
    session: Option<Session>,
}

impl DeviceConnector {
    /// Create a connector for the printer whose name contains `target`
    pub fn new(target: impl Into<String>, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            target: target.into(),
            registry,
            capacity: SINK_CAPACITY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            session: None,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.sink.is_closed())
    }

    /// Name of the bound print service
    pub fn service_name(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.service.name())
    }

    /// Bind to the target printer; no-op when already connected
    #[instrument(skip(self), fields(target = %self.target))]
    pub fn connect(&mut self) -> PrintResult<()> {
        if self.is_connected() {
            debug!("Printer already connected");
            return Ok(());
        }

        let service = self.resolve()?;
        info!(printer = service.name(), "Printer connected");

        let sink = SpoolSink::new(service.clone(), self.capacity, self.settle_delay);
        self.session = Some(Session { service, sink });
        Ok(())
    }

    /// Flush pending bytes and release the session; no-op when disconnected
    ///
    /// The session is released even if the final flush fails.
    #[instrument(skip(self), fields(target = %self.target))]
    pub fn disconnect(&mut self) -> PrintResult<()> {
        let Some(mut session) = self.session.take() else {
            debug!("Printer not connected");
            return Ok(());
        };

        session.sink.close()?;
        info!(printer = session.service.name(), "Printer disconnected");
        Ok(())
    }

    /// Drop the session without flushing so the next use reconnects
    pub fn invalidate(&mut self) {
        if let Some(session) = self.session.take() {
            warn!(
                printer = session.service.name(),
                discarded = session.sink.pending(),
                "Printer session invalidated"
            );
        }
    }

    /// The buffered sink, connecting first if needed
    pub fn output(&mut self) -> PrintResult<&mut SpoolSink> {
        if !self.is_connected() {
            self.connect()?;
        }

        self.session
            .as_mut()
            .map(|session| &mut session.sink)
            .ok_or_else(|| PrintError::DeviceNotFound(self.target.clone()))
    }

    /// The reverse channel of the bound service
    ///
    /// `Ok(None)` when disconnected or when the transport is one-way.
    pub fn input(&mut self) -> PrintResult<Option<Box<dyn ByteSource>>> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };

        let channel = session.service.reverse_channel()?;
        if channel.is_none() {
            warn!(
                printer = session.service.name(),
                "Bidirectional communication not supported by this connection"
            );
        }
        Ok(channel)
    }

    fn resolve(&self) -> PrintResult<Arc<dyn PrintService>> {
        let services = self.registry.services()?;
        info!(count = services.len(), "Print services found");

        for service in services {
            debug!(name = service.name(), "Print service");
            if matches_target(service.name(), &self.target) {
                return Ok(service);
            }
        }

        warn!("No print service matches target, trying system default");
        self.registry.default_service()?.ok_or_else(|| {
            PrintError::DeviceNotFound(format!(
                "no printer matches '{}' and no default printer is set",
                self.target
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryPrinter, MemoryRegistry};

    fn connector_for(registry: MemoryRegistry, target: &str) -> DeviceConnector {
        DeviceConnector::new(target, Arc::new(registry)).with_settle_delay(Duration::ZERO)
    }

    #[test]
    fn test_matches_target() {
        assert!(matches_target("DIG-58iiA", "dig-58iia"));
        assert!(matches_target("POS-58 (DIG-58iiA) USB", "DIG-58"));
        assert!(!matches_target("Microsoft Print to PDF", "DIG-58"));
    }

    #[test]
    fn test_connect_matches_by_name() {
        let pdf = Arc::new(MemoryPrinter::new("Microsoft Print to PDF"));
        let pos = Arc::new(MemoryPrinter::new("POS-58 DIG-58iiA"));
        let registry = MemoryRegistry::new()
            .with_service(pdf.clone())
            .with_service(pos.clone());

        let mut connector = connector_for(registry, "dig-58iia");
        connector.connect().unwrap();

        assert!(connector.is_connected());
        assert_eq!(connector.service_name(), Some("POS-58 DIG-58iiA"));
    }

    #[test]
    fn test_connect_falls_back_to_default() {
        let other = Arc::new(MemoryPrinter::new("Label Printer"));
        let fallback = Arc::new(MemoryPrinter::new("Default Printer"));
        let registry = MemoryRegistry::new()
            .with_service(other)
            .with_default(fallback);

        let mut connector = connector_for(registry, "DIG-58iiA");
        connector.connect().unwrap();

        assert_eq!(connector.service_name(), Some("Default Printer"));
    }

    #[test]
    fn test_connect_without_services() {
        let mut connector = connector_for(MemoryRegistry::new(), "DIG-58iiA");

        let result = connector.connect();
        assert!(matches!(result, Err(PrintError::DeviceNotFound(_))));
        assert!(!connector.is_connected());
    }

    #[test]
    fn test_connect_is_idempotent() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector = connector_for(MemoryRegistry::new().with_service(printer), "DIG");

        connector.connect().unwrap();
        connector.output().unwrap().write(b"abc").unwrap();
        connector.connect().unwrap();

        assert!(connector.is_connected());
        // same session, buffered bytes survive
        assert_eq!(connector.output().unwrap().pending(), 3);
    }

    #[test]
    fn test_disconnect_flushes() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector =
            connector_for(MemoryRegistry::new().with_service(printer.clone()), "DIG");

        connector.output().unwrap().write(b"hello").unwrap();
        assert!(printer.jobs().is_empty());

        connector.disconnect().unwrap();
        assert!(!connector.is_connected());
        assert_eq!(printer.jobs(), vec![b"hello".to_vec()]);

        // second disconnect is a no-op
        connector.disconnect().unwrap();
    }

    #[test]
    fn test_output_connects_lazily() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector =
            connector_for(MemoryRegistry::new().with_service(printer.clone()), "DIG");
        assert!(!connector.is_connected());

        let sink = connector.output().unwrap();
        sink.write(&[1, 2, 3]).unwrap();
        sink.flush().unwrap();

        assert!(connector.is_connected());
        assert_eq!(printer.jobs(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_input_unavailable_on_one_way_transport() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector = connector_for(MemoryRegistry::new().with_service(printer), "DIG");
        connector.connect().unwrap();

        assert!(connector.input().unwrap().is_none());
    }

    #[test]
    fn test_invalidate_forces_reconnect() {
        let printer = Arc::new(MemoryPrinter::new("DIG-58iiA"));
        let mut connector =
            connector_for(MemoryRegistry::new().with_service(printer.clone()), "DIG");
        connector.output().unwrap().write(b"lost").unwrap();

        connector.invalidate();
        assert!(!connector.is_connected());

        connector.output().unwrap().write(b"kept").unwrap();
        connector.output().unwrap().flush().unwrap();
        assert_eq!(printer.jobs(), vec![b"kept".to_vec()]);
    }

    #[test]
    fn test_sink_flushes_before_overflow() {
        let printer = Arc::new(MemoryPrinter::new("p"));
        let mut sink = SpoolSink::new(printer.clone(), 8, Duration::ZERO);

        sink.write(&[1; 5]).unwrap();
        sink.write(&[2; 5]).unwrap();
        assert_eq!(sink.pending(), 5);
        assert_eq!(printer.jobs(), vec![vec![1; 5]]);

        sink.flush().unwrap();
        assert_eq!(printer.jobs(), vec![vec![1; 5], vec![2; 5]]);
    }

    #[test]
    fn test_sink_oversized_write_goes_direct() {
        let printer = Arc::new(MemoryPrinter::new("p"));
        let mut sink = SpoolSink::new(printer.clone(), 8, Duration::ZERO);

        sink.write(&[1; 3]).unwrap();
        sink.write(&[2; 20]).unwrap();

        assert_eq!(sink.pending(), 0);
        assert_eq!(printer.jobs(), vec![vec![1; 3], vec![2; 20]]);
    }

    #[test]
    fn test_sink_failed_job_is_not_retried() {
        let printer = Arc::new(MemoryPrinter::new("p"));
        let mut sink = SpoolSink::new(printer.clone(), 64, Duration::ZERO);

        printer.set_failing(true);
        sink.write(b"ticket").unwrap();
        assert!(matches!(sink.flush(), Err(PrintError::Transmission(_))));
        assert_eq!(sink.pending(), 0);

        printer.set_failing(false);
        sink.flush().unwrap();
        assert!(printer.jobs().is_empty());
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let printer = Arc::new(MemoryPrinter::new("p"));
        let mut sink = SpoolSink::new(printer, 64, Duration::ZERO);
        sink.close().unwrap();

        assert!(sink.is_closed());
        assert!(sink.write(b"x").is_err());
    }
}
