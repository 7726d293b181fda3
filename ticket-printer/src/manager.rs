//! Printer lifecycle
//!
//! [`PrinterManager`] owns the single [`DeviceConnector`] and serializes all
//! device access behind one mutex, so bytes from concurrent requests never
//! interleave. Device I/O is synchronous and runs on the blocking pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, instrument};

use crate::config::PrinterConfig;
use crate::connector::{DeviceConnector, ServiceRegistry};
use crate::error::{PrintError, PrintResult};
use crate::escpos;
use crate::renderer::TicketRenderer;
use crate::status::{DrawerStatus, PrinterStatus, StatusPoller};
use crate::ticket::Ticket;

struct Inner {
    connector: Mutex<DeviceConnector>,
    /// Last known connection state, readable without the device lock
    connected: AtomicBool,
    renderer: TicketRenderer,
    poller: StatusPoller,
    name: String,
    port: String,
}

/// Shared handle to the configured printer
#[derive(Clone)]
pub struct PrinterManager {
    inner: Arc<Inner>,
}

impl PrinterManager {
    /// Build a manager without touching the device
    pub fn new(config: &PrinterConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        let connector = DeviceConnector::new(config.name.clone(), registry)
            .with_capacity(config.buffer_capacity)
            .with_settle_delay(config.settle_delay);

        let renderer = TicketRenderer::new(config.line_width)
            .with_feed_lines(config.feed_lines)
            .with_footer(config.footer.clone());

        Self {
            inner: Arc::new(Inner {
                connector: Mutex::new(connector),
                connected: AtomicBool::new(false),
                renderer,
                poller: StatusPoller::new(config.status_timeout, config.poll_interval),
                name: config.name.clone(),
                port: config.port.clone(),
            }),
        }
    }

    /// Build a manager and try to connect
    ///
    /// A missing printer is logged, not fatal: every operation retries
    /// the connection on use.
    pub async fn start(config: &PrinterConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        let manager = Self::new(config, registry);
        match manager.connect().await {
            Ok(()) => info!(printer = %config.name, port = %config.port, "Printer ready"),
            Err(e) => error!(printer = %config.name, error = %e, "Printer not available at startup"),
        }
        manager
    }

    pub fn printer_name(&self) -> &str {
        &self.inner.name
    }

    pub fn printer_port(&self) -> &str {
        &self.inner.port
    }

    /// Last known connection state; does not wait for a running job
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub async fn connect(&self) -> PrintResult<()> {
        self.with_connector("connect", |connector| connector.connect())
            .await
    }

    /// Render and print a sale ticket
    #[instrument(skip(self, ticket), fields(ticket = %ticket.ticket_number))]
    pub async fn print_ticket(&self, ticket: &Ticket) -> PrintResult<()> {
        let data = self.inner.renderer.render(ticket)?;
        self.send("print_ticket", data).await?;
        info!(items = ticket.items.len(), "Ticket printed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn print_test_page(&self) -> PrintResult<()> {
        let data = self
            .inner
            .renderer
            .render_test_page(&self.inner.name, &self.inner.port)?;
        self.send("print_test_page", data).await?;
        info!("Test page printed");
        Ok(())
    }

    /// Pulse the cash drawer
    #[instrument(skip(self))]
    pub async fn open_cash_drawer(&self) -> PrintResult<()> {
        self.send("open_cash_drawer", escpos::drawer_kick()).await?;
        info!("Cash drawer opened");
        Ok(())
    }

    /// Query the drawer sensor; `Unknown` whenever no answer arrives
    pub async fn drawer_status(&self) -> DrawerStatus {
        let inner = self.inner.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut connector = inner.connector.lock();
            let status = inner.poller.query(&mut connector);
            inner
                .connected
                .store(connector.is_connected(), Ordering::SeqCst);
            status
        })
        .await;

        result.unwrap_or_else(|e| {
            error!(error = %e, "Drawer status task failed");
            DrawerStatus::Unknown
        })
    }

    /// Printer snapshot, optionally including a live drawer query
    pub async fn status(&self, query_drawer: bool) -> PrinterStatus {
        let drawer_open = if query_drawer {
            self.drawer_status().await.as_open_flag()
        } else {
            None
        };
        self.snapshot(drawer_open)
    }

    /// Printer snapshot with a drawer state obtained by the caller
    pub fn snapshot(&self, drawer_open: Option<bool>) -> PrinterStatus {
        PrinterStatus {
            connected: self.is_connected(),
            printer_name: self.inner.name.clone(),
            printer_port: self.inner.port.clone(),
            has_paper: true,
            drawer_open,
        }
    }

    /// Flush pending output and release the printer
    pub async fn shutdown(&self) -> PrintResult<()> {
        self.with_connector("shutdown", |connector| connector.disconnect())
            .await
    }

    /// Write one job and flush it
    async fn send(&self, op: &'static str, data: Vec<u8>) -> PrintResult<()> {
        self.with_connector(op, move |connector| {
            let sink = connector.output()?;
            sink.write(&data)?;
            sink.flush()
        })
        .await
    }

    /// Run `f` on the blocking pool with exclusive access to the connector
    ///
    /// Transport failures drop the session so the next call reconnects.
    async fn with_connector<T, F>(&self, op: &'static str, f: F) -> PrintResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DeviceConnector) -> PrintResult<T> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut connector = inner.connector.lock();
            let result = f(&mut connector);

            if let Err(e) = &result {
                error!(op, error = %e, "Printer operation failed");
                if e.invalidates_session() {
                    connector.invalidate();
                }
            }
            inner
                .connected
                .store(connector.is_connected(), Ordering::SeqCst);
            result
        })
        .await
        .map_err(|e| PrintError::Task(format!("{}: {}", op, e)))?
    }
}
