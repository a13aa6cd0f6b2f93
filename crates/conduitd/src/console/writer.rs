//! Line writer for the host console.

use std::cell::RefCell;
use std::io::{self, Write};

use tracing::warn;

use super::{CONSOLE_TARGET, OutputSink};

/// Writes lines to the host console.
#[derive(Debug)]
pub struct ConsoleWriter<W> {
    writer: RefCell<W>,
}

impl<W: Write> ConsoleWriter<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl ConsoleWriter<io::Stdout> {
    /// Console writer on the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> OutputSink for ConsoleWriter<W> {
    fn emit(&self, line: &str) {
        let mut writer = self.writer.borrow_mut();
        let result = writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(error) = result {
            warn!(
                target: CONSOLE_TARGET,
                error = %error,
                "failed to write host console output"
            );
        }
    }
}
