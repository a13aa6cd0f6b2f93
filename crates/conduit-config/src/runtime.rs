//! Runtime artefact paths shared by the host and the client.
//!
//! Reverse channels are addressed by session identifier. The client binds a
//! socket at [`RuntimePaths::session_socket`] before registering and the host
//! connects to the same path, so both sides must derive it identically.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::defaults::default_base_directory;
use crate::socket::{SocketPreparationError, create_private_directory};
use crate::{Config, SocketEndpoint};

/// Longest session identifier accepted for socket addressing.
const MAX_SESSION_ID_LEN: usize = 64;

/// Canonical paths for runtime artefacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    runtime_dir: Utf8PathBuf,
    sessions_dir: Utf8PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration without touching
    /// the filesystem.
    ///
    /// Unix listeners keep session sockets next to the listener socket; TCP
    /// listeners fall back to the per-user runtime directory.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = match config.daemon_socket() {
            SocketEndpoint::Unix { path } => path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .map(Utf8Path::to_path_buf)
                .ok_or_else(|| RuntimePathsError::MissingSocketParent {
                    path: path.to_string(),
                })?,
            SocketEndpoint::Tcp { .. } => default_base_directory(),
        };
        Ok(Self {
            sessions_dir: runtime_dir.join("sessions"),
            runtime_dir,
        })
    }

    /// Creates the session socket directory with owner-only permissions.
    pub fn prepare(&self) -> Result<(), RuntimePathsError> {
        create_private_directory(&self.sessions_dir).map_err(RuntimePathsError::Prepare)
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Utf8Path {
        &self.runtime_dir
    }

    /// Directory holding per-session reverse channel sockets.
    #[must_use]
    pub fn sessions_dir(&self) -> &Utf8Path {
        &self.sessions_dir
    }

    /// Reverse channel socket for the session `id`.
    ///
    /// Identifiers are restricted to ASCII alphanumerics, `-`, `_` and `.` so
    /// a client cannot steer the host outside the sessions directory.
    pub fn session_socket(&self, id: &str) -> Result<Utf8PathBuf, RuntimePathsError> {
        if !is_addressable_id(id) {
            return Err(RuntimePathsError::InvalidSessionId { id: id.to_owned() });
        }
        Ok(self.sessions_dir.join(format!("{id}.sock")))
    }
}

fn is_addressable_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && !id.starts_with('.')
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

/// Errors raised while deriving runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The listener socket path lacked a parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingSocketParent { path: String },
    /// The session identifier cannot be used as a socket file name.
    #[error("session id '{id}' cannot address a reverse channel")]
    InvalidSessionId { id: String },
    /// Creating the sessions directory failed.
    #[error("failed to prepare runtime directory: {0}")]
    Prepare(#[source] SocketPreparationError),
}
