//! CUPS print queues (Linux/macOS)
//!
//! Queues are enumerated with `lpstat` and jobs are handed to `lp` in RAW
//! mode so ESC/POS bytes reach the device unfiltered. The spooler offers no
//! way back from the printer.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::connector::{PrintService, ServiceRegistry};
use crate::error::{PrintError, PrintResult};

/// Queue names from `lpstat -e` output (one per line)
fn parse_queue_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default queue from `lpstat -d` output
///
/// Format: `system default destination: NAME` or
/// `no system default destination`.
fn parse_default_destination(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (label, name) = line.split_once(':')?;
        if !label.trim().ends_with("default destination") {
            return None;
        }
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Run `lpstat` and return stdout; a missing CUPS install counts as "no printers"
fn lpstat(arg: &str) -> Option<String> {
    match Command::new("lpstat").arg(arg).output() {
        Ok(output) => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
        Err(e) => {
            warn!(error = %e, "Failed to run lpstat");
            None
        }
    }
}

/// Registry over the local CUPS queues
#[derive(Debug, Default, Clone, Copy)]
pub struct CupsSpooler;

impl ServiceRegistry for CupsSpooler {
    fn services(&self) -> PrintResult<Vec<Arc<dyn PrintService>>> {
        let queues = lpstat("-e").map(|out| parse_queue_list(&out)).unwrap_or_default();
        Ok(queues
            .into_iter()
            .map(|name| Arc::new(CupsQueue { name }) as Arc<dyn PrintService>)
            .collect())
    }

    fn default_service(&self) -> PrintResult<Option<Arc<dyn PrintService>>> {
        Ok(lpstat("-d")
            .and_then(|out| parse_default_destination(&out))
            .map(|name| Arc::new(CupsQueue { name }) as Arc<dyn PrintService>))
    }
}

/// One CUPS queue
pub struct CupsQueue {
    name: String,
}

impl PrintService for CupsQueue {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, data), fields(queue = %self.name, data_len = data.len()))]
    fn submit_job(&self, data: &[u8]) -> PrintResult<()> {
        let mut command = Command::new("lp");
        command.args(["-d", &self.name, "-o", "raw", "-s"]);
        pipe_job(command, data)
    }
}

/// Feed a job to a spooler command and collect its verdict
///
/// The child is always reaped. When it exits early and closes its input,
/// its stderr is the error reported, not the broken pipe.
fn pipe_job(mut command: Command, data: &[u8]) -> PrintResult<()> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PrintError::Transmission(format!("Failed to run lp: {}", e)))?;

    // stdin is dropped at the end of the match so lp sees EOF
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(data),
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .map_err(|e| PrintError::Transmission(format!("lp did not finish: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PrintError::Transmission(format!(
            "lp rejected job: {}",
            stderr.trim()
        )));
    }
    written.map_err(|e| PrintError::Transmission(format!("Write to lp failed: {}", e)))
}
