//! ESC/POS command encoding
//!
//! Two layers:
//! - Command functions: stateless, each returns one fixed-format frame.
//!   These bytes are the wire contract with the printer firmware.
//! - [`EscPosBuilder`]: a fluent API that composes frames and text into
//!   one print job.

use crate::encoding::{encode_text, text_width};
use crate::error::{PrintError, PrintResult};

/// ESC (0x1B) - Command prefix
pub const ESC: u8 = 0x1B;
/// GS (0x1D) - Extended command prefix
pub const GS: u8 = 0x1D;
/// DLE (0x10) - Real-time command prefix
pub const DLE: u8 = 0x10;
/// EOT (0x04)
pub const EOT: u8 = 0x04;

/// Largest QR payload accepted by [`qr_code`], in bytes
pub const QR_MAX_PAYLOAD: usize = 255;

/// QR module size in dots
const QR_MODULE_SIZE: u8 = 4;

/// Text justification (`ESC a n`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

// ============================================================================
// Command frames
// ============================================================================

/// Reset print mode and alignment (`ESC ! 0`, `ESC a 0`)
pub fn init() -> Vec<u8> {
    vec![ESC, b'!', 0, ESC, b'a', 0]
}

/// Select justification (`ESC a n`)
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// Emphasized mode on/off (`ESC E n`)
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(enabled)]
}

/// Underline mode on/off (`ESC - n`)
pub fn underline(enabled: bool) -> Vec<u8> {
    vec![ESC, b'-', u8::from(enabled)]
}

/// Character size (`GS ! n`)
///
/// Only the low bit of each factor is used: `n = (w & 1) << 4 | (h & 1) << 5`.
pub fn font_size(width: u8, height: u8) -> Vec<u8> {
    vec![GS, b'!', ((width & 0x01) << 4) | ((height & 0x01) << 5)]
}

/// Feed and full cut (`GS V 65`)
pub fn cut() -> Vec<u8> {
    vec![GS, b'V', b'A']
}

/// Print and feed n lines (`ESC d n`)
pub fn feed_lines(lines: u8) -> Vec<u8> {
    vec![ESC, b'd', lines]
}

/// Cash drawer pulse on pin 2: 50 ms on, 100 ms off (`ESC p 0 50 100`)
pub fn drawer_kick() -> Vec<u8> {
    vec![ESC, b'p', 0, 50, 100]
}

/// Real-time printer status request (`DLE EOT 1`)
pub fn status_query() -> Vec<u8> {
    vec![DLE, EOT, 1]
}

/// Store and print a QR code (`GS ( k`, functions 165/167/169/180/181)
///
/// Payloads longer than [`QR_MAX_PAYLOAD`] bytes are rejected before
/// anything is produced.
pub fn qr_code(content: &str) -> PrintResult<Vec<u8>> {
    let data = content.as_bytes();
    if data.len() > QR_MAX_PAYLOAD {
        return Err(PrintError::Encoding(format!(
            "QR payload is {} bytes, maximum is {}",
            data.len(),
            QR_MAX_PAYLOAD
        )));
    }

    let mut buf = Vec::with_capacity(data.len() + 41);

    // Function 165: Select model (Model 2)
    buf.extend_from_slice(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x31, 0x00]);

    // Function 167: Set module size
    buf.extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, QR_MODULE_SIZE]);

    // Function 169: Set error correction (L)
    buf.extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x30]);

    // Function 180: Store data
    let len = data.len() + 3;
    let p_l = (len & 0xFF) as u8;
    let p_h = ((len >> 8) & 0xFF) as u8;
    buf.extend_from_slice(&[GS, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
    buf.extend_from_slice(data);

    // Function 181: Print
    buf.extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

    Ok(buf)
}

// ============================================================================
// Builder
// ============================================================================

/// ESC/POS job builder
///
/// Starts with [`init`]; text is converted to the printer code page as it
/// is written.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 42-48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(1024);
        buf.extend_from_slice(&init());
        Self { buf, width }
    }

    // === Text Output ===

    /// Write text in the printer code page
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_text(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Left and right text on one line, padded apart
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            self.text(left);
            self.text(" ");
            self.line(right)
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right)
        }
    }

    /// Append bytes that are already encoded
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&feed_lines(lines));
        self
    }

    // === Alignment ===

    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        self.buf.extend_from_slice(&align(alignment));
        self
    }

    pub fn center(&mut self) -> &mut Self {
        self.align(Alignment::Center)
    }

    pub fn left(&mut self) -> &mut Self {
        self.align(Alignment::Left)
    }

    pub fn right(&mut self) -> &mut Self {
        self.align(Alignment::Right)
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&bold(true));
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&bold(false));
        self
    }

    pub fn underline(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&underline(true));
        self
    }

    pub fn underline_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&underline(false));
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&font_size(1, 1));
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&font_size(0, 1));
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&font_size(0, 0));
        self
    }

    // === Separators ===

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === QR Code ===

    /// Print a QR code
    ///
    /// On error the buffer is left untouched.
    pub fn qr_code(&mut self, content: &str) -> PrintResult<&mut Self> {
        let frame = qr_code(content)?;
        self.buf.extend_from_slice(&frame);
        Ok(self)
    }

    // === Paper / Drawer ===

    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&cut());
        self
    }

    pub fn open_drawer(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&drawer_kick());
        self
    }

    // === Build ===

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}
