//! Wire vocabulary shared by the Conduit host and its clients.
//!
//! Messages are `(tag, payload)` pairs. Tags are fixed integers that select a
//! handler on the host (inbound) or describe a result delivered over a
//! session's reverse channel (outbound). Payloads are strings whose packed
//! fields are separated by NUL. On the socket transport every message travels
//! as one JSON object per line.

mod fields;
mod frame;
mod tag;

pub use fields::{FIELD_SEPARATOR, join_fields, split_fields};
pub use frame::{FrameError, InboundFrame, OutboundFrame, ReplyFrame, decode_line, encode_line};
pub use tag::{MessageTag, UnknownTag};

/// Reply to a version probe from a host that speaks the session protocol.
pub const VERSION_TOKEN: &str = "version:2.0a";

/// Synchronous acknowledgement for a command that evaluated successfully.
pub const ACK_OK: &str = "ok";

/// Synchronous acknowledgement for a command that failed to compile or run.
pub const ACK_ERROR: &str = "error";
