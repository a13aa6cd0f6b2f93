//! Transport primitives the session layer depends on.
//!
//! The dispatcher, broadcaster and reaper only ever see these traits; the
//! socket implementation lives in [`crate::transport`].

use std::io;
use std::rc::Rc;

use conduit_config::RuntimePathsError;
use conduit_protocol::{FrameError, MessageTag};
use thiserror::Error;

/// A point-to-point channel from the host to one client.
pub trait Channel {
    /// Delivers `payload` tagged with `tag`. `Ok` is the delivery
    /// acknowledgement.
    fn send(&self, payload: &str, tag: MessageTag) -> Result<(), ChannelError>;

    /// Whether the peer is still reachable.
    fn is_valid(&self) -> bool;

    /// Closes the channel. Further sends fail and `is_valid` reports `false`.
    fn delete(&self);
}

/// Opens reverse channels addressed by session identifier.
pub trait Transport {
    /// Opens a channel to the client that registered `id`.
    fn open_point_to_point(&self, id: &str) -> Result<Rc<dyn Channel>, ChannelError>;
}

/// Errors raised by channel primitives.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The session identifier cannot be turned into a channel address.
    #[error("cannot address reverse channel: {source}")]
    Address {
        /// Path derivation failure.
        #[source]
        source: RuntimePathsError,
    },
    /// Connecting to the client's reverse channel failed.
    #[error("failed to connect reverse channel for session '{id}': {source}")]
    Connect {
        /// Session the channel was opened for.
        id: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing to the channel failed.
    #[error("failed to write to reverse channel: {source}")]
    Send {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The message could not be framed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The channel has been deleted or its peer has gone away.
    #[error("reverse channel is closed")]
    Closed,
    /// The platform has no reverse channel support.
    #[error("reverse channels are unsupported on this platform")]
    Unsupported,
}
