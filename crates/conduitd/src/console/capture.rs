//! Capture of printed lines during legacy evaluation.

use std::cell::RefCell;
use std::rc::Rc;

use super::OutputSink;

/// Forwards every line to the previous sink while keeping a copy.
///
/// Used by legacy evaluation to return everything printed during a request
/// alongside its result.
pub struct CaptureSink {
    forward: Rc<dyn OutputSink>,
    captured: RefCell<String>,
}

impl CaptureSink {
    /// Captures on top of `forward`.
    #[must_use]
    pub fn new(forward: Rc<dyn OutputSink>) -> Self {
        Self {
            forward,
            captured: RefCell::new(String::new()),
        }
    }

    /// Takes the newline-terminated lines captured so far.
    #[must_use]
    pub fn take(&self) -> String {
        self.captured.take()
    }
}

impl OutputSink for CaptureSink {
    fn emit(&self, line: &str) {
        self.forward.emit(line);
        let mut captured = self.captured.borrow_mut();
        captured.push_str(line);
        captured.push('\n');
    }
}
