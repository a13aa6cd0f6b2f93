//! Message dispatch for inbound `(tag, payload)` pairs.
//!
//! Every message arriving on the host's listener passes through
//! [`Dispatcher::dispatch`], which routes it by [`MessageTag`] to one of the
//! protocol handlers:
//!
//! | Tag | Handler |
//! |-----|---------|
//! | 900 | version probe, replies with [`VERSION_TOKEN`] |
//! | 100 | register a session |
//! | 200 | unregister a session |
//! | 500 | command: evaluate, reply on the reverse channel, acknowledge |
//! | 501 | query: evaluate, reply synchronously |
//! | 0   | legacy one-shot evaluation without a session |
//!
//! Unknown tags, including outbound tags sent inbound, are logged and
//! produce no reply.
//!
//! [`MessageTag`]: conduit_protocol::MessageTag
//! [`VERSION_TOKEN`]: conduit_protocol::VERSION_TOKEN

mod errors;
mod evaluate;
mod router;
mod sessions;

pub use self::errors::DispatchError;
pub use self::router::Dispatcher;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
