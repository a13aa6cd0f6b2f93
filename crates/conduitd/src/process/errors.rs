//! Launch failures.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::evaluator::EvalError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or running the host.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the host failed.
    #[error("host bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The Lua host could not be built or its init script failed.
    #[error("failed to start Lua host: {source}")]
    Evaluator {
        /// Underlying evaluator error.
        #[source]
        source: EvalError,
    },
    /// The listener could not be bound or stopped cleanly.
    #[error("host listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
    /// Signal handlers could not be installed.
    #[error("failed to watch for shutdown: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<EvalError> for LaunchError {
    fn from(source: EvalError) -> Self {
        Self::Evaluator { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
