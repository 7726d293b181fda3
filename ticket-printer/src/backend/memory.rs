//! In-memory virtual printer
//!
//! Records every submitted job instead of printing it. Used for dry runs
//! (`PRINTER_BACKEND=memory`) and tests. A reverse channel can be enabled
//! to emulate a printer that answers real-time status requests.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::connector::{ByteSource, PrintService, ServiceRegistry};
use crate::error::{PrintError, PrintResult};
use crate::escpos;

/// How the virtual printer behaves on its reverse channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReverseChannel {
    /// One-way transport, like most spoolers
    None,
    /// Channel exists but the printer never answers
    Silent,
    /// Answers each status request with this byte
    Reply(u8),
}

/// Virtual printer that records jobs
pub struct MemoryPrinter {
    name: String,
    jobs: Mutex<Vec<Vec<u8>>>,
    inbound: Arc<Mutex<VecDeque<u8>>>,
    reverse: ReverseChannel,
    failing: AtomicBool,
}

impl MemoryPrinter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: Mutex::new(Vec::new()),
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            reverse: ReverseChannel::None,
            failing: AtomicBool::new(false),
        }
    }

    /// Answer every `DLE EOT 1` with `status_byte`
    pub fn with_status_reply(mut self, status_byte: u8) -> Self {
        self.reverse = ReverseChannel::Reply(status_byte);
        self
    }

    /// Expose a reverse channel that never answers
    pub fn with_silent_channel(mut self) -> Self {
        self.reverse = ReverseChannel::Silent;
        self
    }

    /// Queue bytes on the reverse channel as if the printer had sent them
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.lock().extend(bytes.iter().copied());
    }

    /// Make subsequent jobs fail as if the spooler rejected them
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Jobs received so far, in order
    pub fn jobs(&self) -> Vec<Vec<u8>> {
        self.jobs.lock().clone()
    }

    pub fn clear(&self) {
        self.jobs.lock().clear();
    }
}

impl PrintService for MemoryPrinter {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit_job(&self, data: &[u8]) -> PrintResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PrintError::Transmission(format!(
                "{}: job rejected",
                self.name
            )));
        }

        self.jobs.lock().push(data.to_vec());

        if let ReverseChannel::Reply(status_byte) = self.reverse {
            let query = escpos::status_query();
            let requests = data
                .windows(query.len())
                .filter(|window| *window == query.as_slice())
                .count();
            let mut inbound = self.inbound.lock();
            inbound.extend(std::iter::repeat_n(status_byte, requests));
        }
        Ok(())
    }

    fn reverse_channel(&self) -> PrintResult<Option<Box<dyn ByteSource>>> {
        match self.reverse {
            ReverseChannel::None => Ok(None),
            ReverseChannel::Silent | ReverseChannel::Reply(_) => Ok(Some(Box::new(MemoryChannel {
                inbound: self.inbound.clone(),
            }))),
        }
    }
}

struct MemoryChannel {
    inbound: Arc<Mutex<VecDeque<u8>>>,
}

impl ByteSource for MemoryChannel {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.inbound.lock().len())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inbound.lock().pop_front())
    }
}

/// Registry over a fixed set of virtual printers
#[derive(Default)]
pub struct MemoryRegistry {
    services: Vec<Arc<dyn PrintService>>,
    default: Option<Arc<dyn PrintService>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: Arc<dyn PrintService>) -> Self {
        self.services.push(service);
        self
    }

    /// Set the system default; it is not added to the enumerated list
    pub fn with_default(mut self, service: Arc<dyn PrintService>) -> Self {
        self.default = Some(service);
        self
    }
}

impl ServiceRegistry for MemoryRegistry {
    fn services(&self) -> PrintResult<Vec<Arc<dyn PrintService>>> {
        Ok(self.services.clone())
    }

    fn default_service(&self) -> PrintResult<Option<Arc<dyn PrintService>>> {
        Ok(self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_jobs() {
        let printer = MemoryPrinter::new("virtual");
        printer.submit_job(b"one").unwrap();
        printer.submit_job(b"two").unwrap();

        assert_eq!(printer.jobs(), vec![b"one".to_vec(), b"two".to_vec()]);
        printer.clear();
        assert!(printer.jobs().is_empty());
    }

    #[test]
    fn test_one_way_by_default() {
        let printer = MemoryPrinter::new("virtual");
        assert!(printer.reverse_channel().unwrap().is_none());
    }

    #[test]
    fn test_status_reply() {
        let printer = MemoryPrinter::new("virtual").with_status_reply(0x16);
        let mut channel = printer.reverse_channel().unwrap().unwrap();
        assert_eq!(channel.available().unwrap(), 0);

        printer.submit_job(&escpos::status_query()).unwrap();
        assert_eq!(channel.available().unwrap(), 1);
        assert_eq!(channel.read_byte().unwrap(), Some(0x16));
        assert_eq!(channel.read_byte().unwrap(), None);
    }

    #[test]
    fn test_silent_channel_skip() {
        let printer = MemoryPrinter::new("virtual").with_silent_channel();
        printer.push_inbound(&[1, 2, 3]);
        printer.submit_job(&escpos::status_query()).unwrap();

        let mut channel = printer.reverse_channel().unwrap().unwrap();
        assert_eq!(channel.skip(3).unwrap(), 3);
        assert_eq!(channel.available().unwrap(), 0);
    }
}
