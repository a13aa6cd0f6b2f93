//! Periodic removal of sessions whose client has gone away.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use conduit_config::MAX_REAP_INTERVAL_SECS;
use tracing::{debug, info};

use crate::session::{Registry, SESSION_TARGET};

/// Sweeps the registry for sessions without a usable reverse channel.
#[derive(Debug)]
pub struct Reaper {
    registry: Rc<RefCell<Registry>>,
    interval: Duration,
    next_sweep: Instant,
}

impl Reaper {
    /// Creates a reaper whose first sweep is due one `interval` from now.
    /// Intervals longer than [`MAX_REAP_INTERVAL_SECS`] are capped.
    #[must_use]
    pub fn new(registry: Rc<RefCell<Registry>>, interval: Duration) -> Self {
        let interval = interval.min(Duration::from_secs(MAX_REAP_INTERVAL_SECS));
        Self {
            registry,
            interval,
            next_sweep: Instant::now() + interval,
        }
    }

    /// When the next sweep is due.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.next_sweep
    }

    /// Sweeps if the deadline has passed and schedules the next sweep.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        if now < self.next_sweep {
            return Vec::new();
        }
        self.next_sweep = now + self.interval;
        self.sweep()
    }

    /// Removes every session that is not alive and returns their identifiers.
    ///
    /// Sessions with an invalid channel have it deleted; sessions that never
    /// obtained a channel are dropped outright.
    pub fn sweep(&self) -> Vec<String> {
        let removed = self
            .registry
            .borrow_mut()
            .remove_where(|session| !session.is_alive());
        let ids: Vec<String> = removed
            .iter()
            .map(|session| {
                session.close();
                session.id().to_owned()
            })
            .collect();
        if ids.is_empty() {
            debug!(target: SESSION_TARGET, "reaper sweep found no stale sessions");
        } else {
            info!(
                target: SESSION_TARGET,
                count = ids.len(),
                sessions = ?ids,
                "reaped stale sessions"
            );
        }
        ids
    }
}
