//! Raw TCP printers (port 9100)
//!
//! Most Ethernet thermal printers accept raw ESC/POS on port 9100. Unlike
//! spooler queues, the socket is two-way, so real-time status requests get
//! an answer. One connection is kept open and reused across jobs.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::connector::{ByteSource, PrintService, ServiceRegistry};
use crate::error::{PrintError, PrintResult};

/// Default raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Network printer (TCP port 9100)
pub struct NetworkPrinter {
    name: String,
    addr: SocketAddr,
    timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from an address string (e.g., "192.168.1.100:9100")
    ///
    /// The port defaults to 9100 when omitted. Host names are resolved once.
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let with_port = if addr.contains(':') {
            addr.to_string()
        } else {
            format!("{}:{}", addr, DEFAULT_PORT)
        };

        let addr = with_port
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| PrintError::InvalidConfig(format!("Invalid address: {}", with_port)))?;

        Ok(Self {
            name: addr.to_string(),
            addr,
            timeout: Duration::from_secs(5),
            stream: Mutex::new(None),
        })
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Clone of the live socket, connecting first if needed
    fn stream(&self) -> PrintResult<TcpStream> {
        let mut guard = self.stream.lock();
        if let Some(stream) = guard.as_ref() {
            return Ok(stream.try_clone()?);
        }

        info!(addr = %self.addr, "Connecting to printer");
        let stream = TcpStream::connect_timeout(&self.addr, self.timeout)
            .map_err(|e| PrintError::Transmission(format!("{}: {}", self.addr, e)))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        let clone = stream.try_clone()?;
        *guard = Some(stream);
        Ok(clone)
    }

    fn reset(&self) {
        self.stream.lock().take();
    }
}

impl PrintService for NetworkPrinter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    fn submit_job(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = self.stream()?;

        let result = stream.write_all(data).and_then(|_| stream.flush());
        if let Err(e) = result {
            warn!(error = %e, "Write failed, dropping connection");
            self.reset();
            return Err(PrintError::Transmission(format!("Write failed: {}", e)));
        }
        Ok(())
    }

    fn reverse_channel(&self) -> PrintResult<Option<Box<dyn ByteSource>>> {
        let stream = self.stream()?;
        stream.set_read_timeout(Some(self.timeout))?;
        Ok(Some(Box::new(TcpChannel { stream })))
    }
}

struct TcpChannel {
    stream: TcpStream,
}

impl ByteSource for TcpChannel {
    fn available(&mut self) -> io::Result<usize> {
        let mut probe = [0u8; 64];
        self.stream.set_nonblocking(true)?;
        let peeked = match self.stream.peek(&mut probe) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        };
        self.stream.set_nonblocking(false)?;
        peeked
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

/// Registry holding a single network printer, which is also the default
pub struct NetworkRegistry {
    printer: Arc<NetworkPrinter>,
}

impl NetworkRegistry {
    pub fn new(printer: NetworkPrinter) -> Self {
        Self {
            printer: Arc::new(printer),
        }
    }
}

impl ServiceRegistry for NetworkRegistry {
    fn services(&self) -> PrintResult<Vec<Arc<dyn PrintService>>> {
        Ok(vec![self.printer.clone()])
    }

    fn default_service(&self) -> PrintResult<Option<Arc<dyn PrintService>>> {
        Ok(Some(self.printer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_network_printer_from_addr() {
        let printer = NetworkPrinter::from_addr("192.168.1.100:9101").unwrap();
        assert_eq!(printer.addr().port(), 9101);
    }

    #[test]
    fn test_default_port() {
        let printer = NetworkPrinter::from_addr("192.168.1.100").unwrap();
        assert_eq!(printer.addr().port(), DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_addr() {
        let result = NetworkPrinter::from_addr("not an address:xyz");
        assert!(matches!(result, Err(PrintError::InvalidConfig(_))));
    }

    #[test]
    fn test_job_and_status_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let device = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut request = [0u8; 3];
            socket.read_exact(&mut request).unwrap();
            socket.write_all(&[0x16]).unwrap();
            request
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string()).unwrap();
        let mut channel = printer.reverse_channel().unwrap().unwrap();
        printer.submit_job(&[16, 4, 1]).unwrap();

        assert_eq!(device.join().unwrap(), [16, 4, 1]);
        while channel.available().unwrap() == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(channel.read_byte().unwrap(), Some(0x16));
    }
}
