//! Tag routing.

use std::cell::RefCell;
use std::rc::Rc;

use camino::Utf8Path;
use conduit_protocol::{MessageTag, VERSION_TOKEN};
use tracing::{debug, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::evaluate::EvaluateMode;
use crate::channel::Transport;
use crate::console::{ConsoleBroadcaster, OutputRouter, OutputSink};
use crate::evaluator::{EvalError, LuaHost};
use crate::session::Registry;

/// Single entry point for inbound messages.
///
/// Owns the Lua host and the transport used to open reverse channels; shares
/// the [`Registry`] with the console broadcaster and the reaper.
pub struct Dispatcher {
    pub(super) host: LuaHost,
    pub(super) registry: Rc<RefCell<Registry>>,
    pub(super) transport: Box<dyn Transport>,
}

impl Dispatcher {
    /// Builds a dispatcher over `registry`.
    #[must_use]
    pub fn new(
        host: LuaHost,
        registry: Rc<RefCell<Registry>>,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            host,
            registry,
            transport,
        }
    }

    /// Wires a complete host: an empty registry, a broadcaster mirroring
    /// `console` to sessions, and a Lua state that has run `init_script`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] when the Lua state cannot be prepared or the
    /// init script fails.
    pub fn assemble(
        console: Rc<dyn OutputSink>,
        transport: Box<dyn Transport>,
        init_script: Option<&Utf8Path>,
    ) -> Result<Self, EvalError> {
        let registry = Rc::new(RefCell::new(Registry::new()));
        let broadcaster = ConsoleBroadcaster::new(console, Rc::clone(&registry));
        let router = Rc::new(OutputRouter::new(Rc::new(broadcaster)));
        let host = LuaHost::new(router)?;
        if let Some(script) = init_script {
            host.run_init_script(script)?;
            info!(target: DISPATCH_TARGET, script = %script, "init script completed");
        }
        Ok(Self::new(host, registry, transport))
    }

    /// The Lua host evaluations run in.
    #[must_use]
    pub fn host(&self) -> &LuaHost {
        &self.host
    }

    /// The shared session registry.
    #[must_use]
    pub fn registry(&self) -> &Rc<RefCell<Registry>> {
        &self.registry
    }

    /// Routes one inbound message and returns the synchronous reply, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when a Register payload carries malformed
    /// arguments or a session environment cannot be built or resolved.
    pub fn dispatch(&self, tag: i32, payload: &str) -> Result<Option<String>, DispatchError> {
        let Ok(tag) = MessageTag::try_from(tag) else {
            warn!(target: DISPATCH_TARGET, tag, "ignoring message with unknown tag");
            return Ok(None);
        };
        debug!(target: DISPATCH_TARGET, tag = %tag, bytes = payload.len(), "dispatching message");

        match tag {
            MessageTag::VersionProbe => Ok(Some(VERSION_TOKEN.to_owned())),
            MessageTag::Register => self.register(payload).map(|()| None),
            MessageTag::Unregister => {
                self.unregister(payload);
                Ok(None)
            }
            MessageTag::Command => self.evaluate(payload, EvaluateMode::Command),
            MessageTag::Query => self.evaluate(payload, EvaluateMode::Query),
            MessageTag::Legacy => Ok(Some(self.evaluate_legacy(payload))),
            MessageTag::Error | MessageTag::Output | MessageTag::Return | MessageTag::Console => {
                warn!(
                    target: DISPATCH_TARGET,
                    tag = %tag,
                    "ignoring outbound tag received inbound"
                );
                Ok(None)
            }
        }
    }
}
