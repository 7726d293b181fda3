//! # ticket-printer
//!
//! ESC/POS receipt printing for point-of-sale thermal printers.
//!
//! ## Scope
//!
//! - ESC/POS command frames and a fluent job builder
//! - Windows-1252 text encoding and column helpers
//! - One persistent device session over the OS print spooler, a raw TCP
//!   socket, or an in-memory virtual printer
//! - Sale ticket and test page rendering
//! - Best-effort cash drawer status over the reverse channel
//!
//! ## Example
//!
//! ```ignore
//! use ticket_printer::{PrinterConfig, PrinterManager};
//!
//! let config = PrinterConfig::default();
//! let manager = PrinterManager::start(&config, config.registry()?).await;
//!
//! manager.print_ticket(&ticket).await?;
//! manager.open_cash_drawer().await?;
//! ```

pub mod backend;
mod config;
mod connector;
mod encoding;
mod error;
pub mod escpos;
mod manager;
mod renderer;
mod status;
mod ticket;

// Re-exports
pub use config::{BackendKind, PrinterConfig};
pub use connector::{ByteSource, DeviceConnector, PrintService, ServiceRegistry, SpoolSink};
pub use encoding::{encode_text, pad_text, text_width, truncate_text};
pub use error::{PrintError, PrintResult};
pub use escpos::{Alignment, EscPosBuilder};
pub use manager::PrinterManager;
pub use renderer::TicketRenderer;
pub use status::{DrawerStatus, PrinterStatus, StatusPoller};
pub use ticket::{Ticket, TicketItem};
