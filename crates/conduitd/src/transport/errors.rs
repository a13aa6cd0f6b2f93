//! Listener failures.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while binding or running the host listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host name could not be resolved.
    #[error("cannot resolve listener address {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no usable address.
    #[error("listener address {host}:{port} resolved to nothing")]
    NoAddress { host: String, port: u16 },
    /// Binding the TCP socket failed.
    #[error("cannot listen on {addr}: {source}")]
    BindTcp {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking accepts.
    #[error("cannot make listener non-blocking: {0}")]
    NonBlocking(#[source] io::Error),
    /// Unix endpoints were configured on a platform without them.
    #[cfg(not(unix))]
    #[error("unix socket endpoint {endpoint} is unsupported on this platform")]
    UnixUnsupported { endpoint: String },
    /// Binding the Unix socket failed.
    #[cfg(unix)]
    #[error("cannot listen on unix socket {path}: {source}")]
    BindUnix {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Another host is already serving the socket.
    #[cfg(unix)]
    #[error("unix socket {path} is served by a running host")]
    SocketBusy { path: Utf8PathBuf },
    /// Something other than a socket occupies the path.
    #[cfg(unix)]
    #[error("{path} exists and is not a unix socket")]
    NotASocket { path: Utf8PathBuf },
    /// The existing socket file could not be inspected.
    #[cfg(unix)]
    #[error("cannot inspect existing unix socket {path}: {source}")]
    Inspect {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Probing the existing socket failed for a reason other than staleness.
    #[cfg(unix)]
    #[error("cannot probe existing unix socket {path}: {source}")]
    Probe {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// A stale socket file could not be removed.
    #[cfg(unix)]
    #[error("cannot remove stale unix socket {path}: {source}")]
    RemoveStale {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener accept thread panicked")]
    AcceptPanicked,
}
