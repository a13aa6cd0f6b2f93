//! Command, Query and Legacy evaluation handlers.

use std::rc::Rc;

use conduit_protocol::{ACK_ERROR, ACK_OK, MessageTag, split_fields};
use tracing::{debug, info, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::router::Dispatcher;
use crate::console::{CaptureSink, OutputSink};

/// How an evaluation result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EvaluateMode {
    /// Result over the reverse channel plus a synchronous acknowledgement.
    Command,
    /// Result as the synchronous reply only.
    Query,
}

impl Dispatcher {
    /// Evaluates `<id>\0<code>` in the session's environment.
    pub(super) fn evaluate(
        &self,
        payload: &str,
        mode: EvaluateMode,
    ) -> Result<Option<String>, DispatchError> {
        let (id, code) = split_fields(payload);
        let Some(code) = code else {
            warn!(
                target: DISPATCH_TARGET,
                session = id,
                "unexpected message: evaluation payload lacks a code field"
            );
            return Ok(None);
        };

        if self.discard_if_hung_up(id) {
            return Ok(None);
        }
        let (environment, channel) = {
            let registry = self.registry.borrow();
            let Some(session) = registry.get(id) else {
                warn!(
                    target: DISPATCH_TARGET,
                    session = id,
                    "evaluation for unknown session ignored"
                );
                return Ok(None);
            };
            (
                self.host.environment_table(session.environment())?,
                session.reverse_channel().cloned(),
            )
        };

        let outcome = self.host.evaluate(code, environment);
        let formatted = outcome.formatted();
        if mode == EvaluateMode::Query {
            return Ok(Some(formatted));
        }

        let (tag, ack) = if outcome.succeeded() {
            (MessageTag::Return, ACK_OK)
        } else {
            (MessageTag::Error, ACK_ERROR)
        };
        match channel {
            Some(channel) => {
                if let Err(error) = channel.send(&formatted, tag) {
                    warn!(
                        target: DISPATCH_TARGET,
                        session = id,
                        error = %error,
                        "failed to deliver command result"
                    );
                }
            }
            None => debug!(
                target: DISPATCH_TARGET,
                session = id,
                "session has no reverse channel; result dropped"
            ),
        }
        Ok(Some(ack.to_owned()))
    }

    /// Removes the session when its reverse channel has gone invalid.
    /// Sessions that never obtained a channel are left to the reaper.
    fn discard_if_hung_up(&self, id: &str) -> bool {
        let hung_up = self
            .registry
            .borrow()
            .get(id)
            .and_then(|session| session.reverse_channel())
            .is_some_and(|channel| !channel.is_valid());
        if !hung_up {
            return false;
        }
        if let Some(session) = self.registry.borrow_mut().remove(id) {
            session.close();
        }
        info!(
            target: DISPATCH_TARGET,
            session = id,
            "removed session whose reverse channel hung up; evaluation ignored"
        );
        true
    }

    /// Evaluates a legacy payload (one flag character, then code) in the
    /// host globals and replies with captured output followed by the values.
    pub(super) fn evaluate_legacy(&self, payload: &str) -> String {
        let mut chars = payload.chars();
        let flag = chars.next();
        let code = chars.as_str();
        debug!(target: DISPATCH_TARGET, ?flag, "legacy evaluation");

        let router = self.host.router();
        let capture = Rc::new(CaptureSink::new(router.current()));
        let outcome = {
            let _guard = router.push(Rc::clone(&capture) as Rc<dyn OutputSink>);
            self.host.evaluate_global(code)
        };

        let mut reply = capture.take();
        reply.push_str(&outcome.joined());
        reply
    }
}
