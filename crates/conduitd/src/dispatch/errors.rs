//! Errors surfaced to the caller of [`Dispatcher::dispatch`].
//!
//! Most malformed input is logged and answered with no reply; only the cases
//! below are reported back to the client.
//!
//! [`Dispatcher::dispatch`]: super::Dispatcher::dispatch

use thiserror::Error;

use crate::evaluator::EvalError;

/// Errors surfaced during dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The Register payload's argument field was not a JSON array of strings.
    #[error("failed to decode arguments for session '{id}': {source}")]
    ArgumentDecode {
        /// Session that attempted to register.
        id: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The session's execution environment could not be built or resolved.
    #[error(transparent)]
    Environment(#[from] EvalError),
}

impl DispatchError {
    pub(super) fn argument_decode(id: &str, source: serde_json::Error) -> Self {
        Self::ArgumentDecode {
            id: id.to_owned(),
            source,
        }
    }
}
