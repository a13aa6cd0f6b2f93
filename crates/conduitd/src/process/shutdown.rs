use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::debug;

use super::PROCESS_TARGET;

/// Arranges for a stop flag to be raised when the host should exit.
pub trait ShutdownSignal: Send + Sync {
    /// Wires `stop` to the shutdown source.
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal sources.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering a signal handler failed.
    #[error("failed to install handler for signal {signal}: {source}")]
    Install {
        /// Signal number.
        signal: i32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Raises the stop flag on termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds the signal source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        for signal in [SIGTERM, SIGINT, SIGQUIT, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(stop))
                .map_err(|source| ShutdownError::Install { signal, source })?;
        }
        debug!(target: PROCESS_TARGET, "shutdown signal handlers installed");
        Ok(())
    }
}
