//! User-facing console output
//!
//! Status lines, position redraws and failure messages go through a
//! [`Console`] so quiet mode can silence them and tests can capture them.
//! Diagnostics go through `tracing` instead.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::Arc;

/// How much the console prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Nothing at all
    Quiet,
    /// Status and position lines
    #[default]
    Normal,
    /// Status lines plus debug detail
    Verbose,
}

/// Line-oriented output sink.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    verbosity: Verbosity,
}

impl Console {
    /// Console on standard output.
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::with_writer(io::stdout(), verbosity)
    }

    /// Console over any writer.
    pub fn with_writer(writer: impl Write + Send + 'static, verbosity: Verbosity) -> Self {
        Console {
            out: Mutex::new(Box::new(writer)),
            verbosity,
        }
    }

    /// Console writing into an in-memory buffer, for tests and embedding.
    pub fn capture(verbosity: Verbosity) -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        (Self::with_writer(buffer.clone(), verbosity), buffer)
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Whether verbose detail is printed.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a full line.
    pub fn line(&self, text: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(format_args!("{text}\n"));
        }
    }

    /// Print a line that the next output overwrites (ends in `\r`).
    pub fn status(&self, text: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(format_args!("{text}\r"));
        }
    }

    /// Print a line only in verbose mode.
    pub fn detail(&self, text: impl Display) {
        if self.is_verbose() {
            self.emit(format_args!("{text}\n"));
        }
    }

    /// Print preformatted text as-is (usage, lists).
    pub fn raw(&self, text: &str) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(format_args!("{text}"));
        }
    }

    fn emit(&self, args: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        // console loss is not a playback failure
        let _ = out.write_fmt(args);
        let _ = out.flush();
    }
}

/// Shared byte buffer behind [`Console::capture`].
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_mode() {
        let (console, buffer) = Console::capture(Verbosity::Normal);
        console.line("Playing WAVE a.wav");
        console.status("Playback position: 00:01");
        console.detail("hidden");
        assert_eq!(
            buffer.contents(),
            "Playing WAVE a.wav\nPlayback position: 00:01\r"
        );
    }

    #[test]
    fn test_quiet_mode_prints_nothing() {
        let (console, buffer) = Console::capture(Verbosity::Quiet);
        console.line("a");
        console.status("b");
        console.raw("c");
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_verbose_detail() {
        let (console, buffer) = Console::capture(Verbosity::Verbose);
        console.detail(format_args!("{} bytes", 42));
        assert_eq!(buffer.contents(), "42 bytes\n");
    }
}
