//! Host console sink that mirrors lines to subscribed sessions.

use std::cell::RefCell;
use std::rc::Rc;

use conduit_protocol::MessageTag;
use tracing::{debug, warn};

use super::{CONSOLE_TARGET, OutputSink};
use crate::session::Registry;

/// Host console sink that mirrors every line to interested sessions.
///
/// Lines are written to the wrapped console first, then sent tagged
/// [`MessageTag::Console`] to each session in mirror mode that is not quiet.
pub struct ConsoleBroadcaster {
    console: Rc<dyn OutputSink>,
    registry: Rc<RefCell<Registry>>,
}

impl ConsoleBroadcaster {
    /// Wraps `console`, reading subscribers from `registry`.
    #[must_use]
    pub fn new(console: Rc<dyn OutputSink>, registry: Rc<RefCell<Registry>>) -> Self {
        Self { console, registry }
    }
}

impl OutputSink for ConsoleBroadcaster {
    fn emit(&self, line: &str) {
        self.console.emit(line);

        let Ok(registry) = self.registry.try_borrow() else {
            warn!(
                target: CONSOLE_TARGET,
                "registry busy; console line not mirrored"
            );
            return;
        };
        let payload = format!("{line}\n");
        for session in registry.sessions().filter(|session| session.receives_console()) {
            let Some(channel) = session.reverse_channel() else {
                continue;
            };
            if let Err(error) = channel.send(&payload, MessageTag::Console) {
                debug!(
                    target: CONSOLE_TARGET,
                    session = session.id(),
                    error = %error,
                    "failed to mirror console line"
                );
            }
        }
    }
}
