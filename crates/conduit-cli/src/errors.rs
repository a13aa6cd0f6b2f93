//! Error types for the client runtime.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use conduit_config::RuntimePathsError;
use conduit_protocol::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve host address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to host at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[cfg(not(unix))]
    #[error("platform does not support Unix sockets: {0}")]
    UnsupportedUnixTransport(String),
    #[error("failed to encode request: {0}")]
    EncodeRequest(#[source] FrameError),
    #[error("failed to encode session arguments: {0}")]
    EncodeArguments(#[source] serde_json::Error),
    #[error("failed to send request to host: {0}")]
    SendRequest(io::Error),
    #[error("failed to read reply from host: {0}")]
    ReadReply(io::Error),
    #[error("failed to parse host reply: {0}")]
    ParseReply(#[source] FrameError),
    #[error("host closed the connection without replying")]
    MissingReply,
    #[error("host rejected the request: {0}")]
    Rejected(String),
    #[error("host did not acknowledge session '{id}'")]
    SessionUnknown { id: String },
    #[error(transparent)]
    RuntimePaths(#[from] RuntimePathsError),
    #[error("failed to bind reverse channel at {path}: {source}")]
    BindReverse { path: Utf8PathBuf, source: io::Error },
    #[error("failed to accept reverse channel at {path}: {source}")]
    AcceptReverse { path: Utf8PathBuf, source: io::Error },
    #[error("host never connected to the reverse channel at {path}")]
    ReverseNotConnected { path: Utf8PathBuf },
    #[error("reverse channel closed before the result arrived")]
    ReverseClosed,
    #[error("failed to read code from stdin: {0}")]
    ReadInput(io::Error),
    #[error("failed to write host output: {0}")]
    WriteOutput(io::Error),
}
