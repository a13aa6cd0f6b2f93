//! Stack of output sinks with scoped overrides.

use std::cell::RefCell;
use std::rc::Rc;

use super::OutputSink;

/// Stack of output sinks; lines go to the topmost.
pub struct OutputRouter {
    base: Rc<dyn OutputSink>,
    overlays: RefCell<Vec<Rc<dyn OutputSink>>>,
}

impl OutputRouter {
    /// Routes to `base` until something is pushed.
    #[must_use]
    pub fn new(base: Rc<dyn OutputSink>) -> Self {
        Self {
            base,
            overlays: RefCell::new(Vec::new()),
        }
    }

    /// The sink currently receiving lines.
    #[must_use]
    pub fn current(&self) -> Rc<dyn OutputSink> {
        self.overlays
            .borrow()
            .last()
            .map_or_else(|| Rc::clone(&self.base), Rc::clone)
    }

    /// Makes `sink` current until the returned guard drops.
    #[must_use = "the sink is popped when the guard drops"]
    pub fn push(&self, sink: Rc<dyn OutputSink>) -> SinkGuard<'_> {
        let mut overlays = self.overlays.borrow_mut();
        let depth = overlays.len();
        overlays.push(sink);
        SinkGuard {
            router: self,
            depth,
        }
    }

    /// Number of sinks pushed above the base.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.overlays.borrow().len()
    }
}

impl OutputSink for OutputRouter {
    fn emit(&self, line: &str) {
        // Released before emitting so sinks may print through the router.
        let sink = self.current();
        sink.emit(line);
    }
}

/// Restores the router to its previous sink when dropped.
pub struct SinkGuard<'a> {
    router: &'a OutputRouter,
    depth: usize,
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        self.router.overlays.borrow_mut().truncate(self.depth);
    }
}
