//! Windows spooler queues
//!
//! Uses the Win32 print spooler: `EnumPrintersW` to list installed
//! printers, `GetDefaultPrinterW` for the fallback, and RAW documents
//! through `WritePrinter` for jobs.

use std::sync::Arc;

use tracing::instrument;

use crate::connector::{PrintService, ServiceRegistry};
use crate::error::{PrintError, PrintResult};

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Check if a port is a virtual printer port
fn is_virtual_port(port: &str) -> bool {
    let p = port.to_lowercase();
    p == "file:"
        || p == "portprompt:"
        || p == "xpsport:"
        || p.starts_with("onenote")
        || p == "nul:"
        || p.starts_with("wfsport:")
}

/// Registry over the local Windows spooler
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsSpooler;

impl WindowsSpooler {
    /// List installed printers (filters out virtual printers)
    pub fn list() -> PrintResult<Vec<String>> {
        use windows::Win32::Graphics::Printing::{
            EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_5W,
        };
        use windows::core::PWSTR;

        unsafe {
            let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);

            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                5,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|_| PrintError::DeviceNotFound("EnumPrintersW failed".to_string()))?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_5W;
            let slice = std::slice::from_raw_parts(ptr, returned as usize);

            let mut result = Vec::new();
            for info in slice {
                if info.pPrinterName.is_null() {
                    continue;
                }
                let name = PWSTR(info.pPrinterName.0).to_string().unwrap_or_default();
                let port = if info.pPortName.is_null() {
                    String::new()
                } else {
                    PWSTR(info.pPortName.0).to_string().unwrap_or_default()
                };

                if !is_virtual_port(&port) {
                    result.push(name);
                }
            }

            Ok(result)
        }
    }

    /// Get the default printer name
    pub fn default_printer() -> PrintResult<Option<String>> {
        use windows::Win32::Graphics::Printing::GetDefaultPrinterW;
        use windows::core::PWSTR;

        unsafe {
            let mut needed: u32 = 0;
            let _ = GetDefaultPrinterW(None, &mut needed);

            if needed == 0 {
                return Ok(None);
            }

            let mut buf: Vec<u16> = vec![0; needed as usize];
            let ok = GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed);

            if !ok.as_bool() {
                return Ok(None);
            }

            let name = PWSTR(buf.as_mut_ptr()).to_string().map_err(|e| {
                PrintError::InvalidConfig(format!("Printer name is not UTF-16: {}", e))
            })?;

            Ok(Some(name))
        }
    }
}

impl ServiceRegistry for WindowsSpooler {
    fn services(&self) -> PrintResult<Vec<Arc<dyn PrintService>>> {
        Ok(Self::list()?
            .into_iter()
            .map(|name| Arc::new(WindowsQueue { name }) as Arc<dyn PrintService>)
            .collect())
    }

    fn default_service(&self) -> PrintResult<Option<Arc<dyn PrintService>>> {
        Ok(Self::default_printer()?.map(|name| Arc::new(WindowsQueue { name }) as Arc<dyn PrintService>))
    }
}

/// One Windows printer queue
pub struct WindowsQueue {
    name: String,
}

impl WindowsQueue {
    /// Whether the spooler reports the printer offline
    fn is_offline(&self) -> bool {
        use windows::Win32::Graphics::Printing::{
            ClosePrinter, GetPrinterW, OpenPrinterW, PRINTER_HANDLE, PRINTER_INFO_6,
            PRINTER_STATUS_OFFLINE,
        };
        use windows::core::PCWSTR;

        unsafe {
            let mut handle = PRINTER_HANDLE::default();
            let name_w = to_wide(&self.name);
            if OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None).is_err() {
                return false;
            }

            let mut needed: u32 = 0;
            let _ = GetPrinterW(handle, 6, None, &mut needed);

            let mut offline = false;
            if needed > 0 {
                let mut buf: Vec<u8> = vec![0; needed as usize];
                if GetPrinterW(handle, 6, Some(buf.as_mut_slice()), &mut needed).is_ok() {
                    let info = *(buf.as_ptr() as *const PRINTER_INFO_6);
                    offline = (info.dwStatus & PRINTER_STATUS_OFFLINE) != 0;
                }
            }

            let _ = ClosePrinter(handle);
            offline
        }
    }
}

impl PrintService for WindowsQueue {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, data), fields(printer = %self.name, data_len = data.len()))]
    fn submit_job(&self, data: &[u8]) -> PrintResult<()> {
        use core::ffi::c_void;
        use windows::Win32::Graphics::Printing::{
            ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, OpenPrinterW, PRINTER_HANDLE,
            StartDocPrinterW, StartPagePrinter, WritePrinter,
        };
        use windows::core::{PCWSTR, PWSTR};

        if self.is_offline() {
            return Err(PrintError::Transmission(format!("{} is offline", self.name)));
        }

        unsafe {
            let mut handle = PRINTER_HANDLE::default();
            let name_w = to_wide(&self.name);

            OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None)
                .map_err(|_| PrintError::Transmission("OpenPrinterW failed".to_string()))?;

            let doc_name_w = to_wide("Ticket");
            let datatype_w = to_wide("RAW");
            let doc_info = DOC_INFO_1W {
                pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
                pOutputFile: PWSTR::null(),
                pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
            };

            if StartDocPrinterW(handle, 1, &doc_info as *const DOC_INFO_1W) == 0 {
                let _ = ClosePrinter(handle);
                return Err(PrintError::Transmission("StartDocPrinter failed".to_string()));
            }

            if !StartPagePrinter(handle).as_bool() {
                let _ = EndDocPrinter(handle);
                let _ = ClosePrinter(handle);
                return Err(PrintError::Transmission("StartPagePrinter failed".to_string()));
            }

            let mut written: u32 = 0;
            let ok = WritePrinter(
                handle,
                data.as_ptr() as *const c_void,
                data.len() as u32,
                &mut written,
            );

            let _ = EndPagePrinter(handle);
            let _ = EndDocPrinter(handle);
            let _ = ClosePrinter(handle);

            if !ok.as_bool() {
                return Err(PrintError::Transmission("WritePrinter failed".to_string()));
            }

            if written != data.len() as u32 {
                return Err(PrintError::Transmission(format!(
                    "Incomplete write: {} of {} bytes",
                    written,
                    data.len()
                )));
            }

            Ok(())
        }
    }
}
