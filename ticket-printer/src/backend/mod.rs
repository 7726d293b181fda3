//! Print service backends
//!
//! - [`cups`]: CUPS queues via `lpstat`/`lp` (Unix)
//! - [`windows`]: Win32 spooler queues (Windows)
//! - [`network`]: raw TCP printers, the only two-way transport
//! - [`memory`]: virtual printer for dry runs and tests

#[cfg(unix)]
pub mod cups;
pub mod memory;
pub mod network;
#[cfg(windows)]
pub mod windows;

use std::sync::Arc;

use crate::connector::ServiceRegistry;

/// The OS print spooler for this platform
#[cfg(windows)]
pub fn system_spooler() -> Arc<dyn ServiceRegistry> {
    Arc::new(windows::WindowsSpooler)
}

/// The OS print spooler for this platform
#[cfg(unix)]
pub fn system_spooler() -> Arc<dyn ServiceRegistry> {
    Arc::new(cups::CupsSpooler)
}

/// No spooler on this platform: an empty registry
#[cfg(not(any(unix, windows)))]
pub fn system_spooler() -> Arc<dyn ServiceRegistry> {
    Arc::new(memory::MemoryRegistry::new())
}
