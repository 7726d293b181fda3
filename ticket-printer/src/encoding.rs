//! Code page utilities for Latin thermal printers
//!
//! The receipt printers this crate targets run a single-byte Windows-1252
//! compatible code page, so every printed character takes exactly one column.
//! This module provides utilities for:
//! - Converting UTF-8 text to printer bytes
//! - Calculating printed widths
//! - Truncating/padding strings to column widths

use encoding_rs::WINDOWS_1252;

/// Byte printed in place of characters the code page cannot represent
const REPLACEMENT: u8 = b'?';

fn encode_char(c: char) -> u8 {
    if c.is_ascii() {
        return c as u8;
    }

    let mut tmp = [0u8; 4];
    let (cow, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
    if had_errors || cow.len() != 1 {
        REPLACEMENT
    } else {
        cow[0]
    }
}

/// Convert UTF-8 text to Windows-1252 bytes
///
/// ASCII passes through untouched, so embedded control bytes survive.
/// Unmappable characters become `?` (one byte each, keeping column math exact).
pub fn encode_text(s: &str) -> Vec<u8> {
    s.chars().map(encode_char).collect()
}

/// Number of printer columns a string occupies
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}
