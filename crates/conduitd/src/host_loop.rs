//! The control loop that owns the Lua state and the session registry.
//!
//! Listener threads never touch host state. They forward each request as an
//! [`Envelope`] and block on its reply slot while the loop dispatches
//! requests one at a time, interleaved with reaper sweeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use conduit_protocol::ReplyFrame;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::reaper::Reaper;

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host_loop");

/// Longest the loop waits before re-checking the stop flag.
const STOP_POLL: Duration = Duration::from_millis(250);

/// One inbound request and the slot its reply goes to.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) tag: i32,
    pub(crate) payload: String,
    pub(crate) reply: mpsc::Sender<ReplyFrame>,
}

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    /// The stop flag was raised.
    Stopped,
    /// Every request sender has gone away.
    Disconnected,
}

pub(crate) struct HostLoop {
    dispatcher: Dispatcher,
    reaper: Reaper,
    inbox: mpsc::Receiver<Envelope>,
    stop: Arc<AtomicBool>,
}

impl HostLoop {
    pub(crate) fn new(
        dispatcher: Dispatcher,
        reaper: Reaper,
        inbox: mpsc::Receiver<Envelope>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            dispatcher,
            reaper,
            inbox,
            stop,
        }
    }

    /// Serves requests until stopped or disconnected.
    pub(crate) fn run(&mut self) -> LoopExit {
        loop {
            if self.stop.load(Ordering::SeqCst) {
                info!(target: LOOP_TARGET, "stop requested");
                return LoopExit::Stopped;
            }
            let wait = self
                .reaper
                .deadline()
                .saturating_duration_since(Instant::now())
                .min(STOP_POLL);
            match self.inbox.recv_timeout(wait) {
                Ok(envelope) => self.serve(envelope),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!(target: LOOP_TARGET, "request source closed");
                    return LoopExit::Disconnected;
                }
            }
            self.reaper.tick(Instant::now());
        }
    }

    /// Closes every session's reverse channel and empties the registry.
    pub(crate) fn close_sessions(&self) {
        let sessions = self.dispatcher.registry().borrow_mut().drain();
        for session in &sessions {
            session.close();
        }
        debug!(target: LOOP_TARGET, count = sessions.len(), "sessions closed");
    }

    fn serve(&self, envelope: Envelope) {
        let reply = match self.dispatcher.dispatch(envelope.tag, &envelope.payload) {
            Ok(reply) => ReplyFrame::Reply(reply),
            Err(error) => {
                warn!(
                    target: LOOP_TARGET,
                    tag = envelope.tag,
                    error = %error,
                    "request failed"
                );
                ReplyFrame::Error(error.to_string())
            }
        };
        if envelope.reply.send(reply).is_err() {
            debug!(target: LOOP_TARGET, "client left before the reply was ready");
        }
    }
}
