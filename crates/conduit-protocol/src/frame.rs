//! JSON Lines framing for the socket transport.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request written by a client to the host's listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Integer message tag.
    pub tag: i32,
    /// Request payload; defaults to empty when omitted.
    #[serde(default)]
    pub payload: String,
}

/// The host's synchronous answer to one [`InboundFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyFrame {
    /// Handler outcome; `None` when the handler produces no reply.
    Reply(Option<String>),
    /// The request could not be handled.
    Error(String),
}

/// A message the host pushes over a session's reverse channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    /// Integer message tag.
    pub tag: i32,
    /// Message payload.
    pub payload: String,
}

/// Errors raised while framing messages.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Serialising a frame failed.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    /// A line did not contain a valid frame.
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serialises `frame` as one newline-terminated JSON line.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] when the frame cannot be serialised.
pub fn encode_line<T: Serialize>(frame: &T) -> Result<Vec<u8>, FrameError> {
    let mut line = serde_json::to_vec(frame).map_err(FrameError::Encode)?;
    line.push(b'\n');
    Ok(line)
}

/// Parses one JSON line, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`FrameError::Decode`] when the line is not a valid frame.
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, FrameError> {
    serde_json::from_slice(line.trim_ascii()).map_err(FrameError::Decode)
}
