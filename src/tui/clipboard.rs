//! Terminal clipboard via OSC 52.
//!
//! The terminal itself owns the clipboard; we hand it base64 text in an
//! escape sequence. Works over SSH and in most modern emulators. Terminals
//! without OSC 52 support silently ignore it.

use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crossterm::execute;
use crossterm::style::Print;

/// Escape sequence that sets the system clipboard to `text`.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// Copies `text` to the clipboard through `out`.
pub fn copy_to<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    execute!(out, Print(osc52_sequence(text)))
}

/// Copies `text` to the clipboard through stdout.
pub fn copy(text: &str) -> io::Result<()> {
    copy_to(&mut io::stdout(), text)
}
