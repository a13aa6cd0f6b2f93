//! Host output sinks.
//!
//! Every line printed on the host flows through an [`OutputRouter`]. The
//! bottom of its stack is normally a [`ConsoleBroadcaster`] wrapping the host
//! console; legacy evaluations temporarily push a [`CaptureSink`] on top.

mod broadcast;
mod capture;
mod router;
mod writer;

pub use self::broadcast::ConsoleBroadcaster;
pub use self::capture::CaptureSink;
pub use self::router::{OutputRouter, SinkGuard};
pub use self::writer::ConsoleWriter;

/// Tracing target for console output handling.
pub(crate) const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// Receives complete output lines, without trailing newline.
pub trait OutputSink {
    /// Handles one printed line.
    fn emit(&self, line: &str);
}
