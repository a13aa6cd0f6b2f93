//! Socket transport for the host.
//!
//! The listener binds the configured endpoint and accepts connections in a
//! background thread. Each connection carries one JSONL request which is
//! forwarded to the control loop; the reply is written back on the same
//! connection. Reverse channels to clients are opened by [`SocketTransport`].

mod errors;
mod handler;
mod listener;
mod point_to_point;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream, ForwardingHandler};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub use self::point_to_point::SocketTransport;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
