//! Shared configuration for the Conduit host and its command-line client.
//!
//! Both binaries resolve the same [`Config`] so they agree on where the host
//! listens and where session reverse channels live. Values are layered by
//! `ortho_config`: built-in defaults, then `.conduit.toml`, then `CONDUIT_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;
mod runtime;
mod socket;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_REAP_INTERVAL_SECS, DEFAULT_TCP_PORT, MAX_REAP_INTERVAL_SECS,
    default_log_filter, default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration shared by `conduitd` and `conduit`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "CONDUIT_")]
pub struct Config {
    /// Endpoint the host listens on for inbound protocol messages.
    #[ortho_config(default = defaults::default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression applied to structured logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Seconds between liveness sweeps over registered sessions.
    #[ortho_config(default = defaults::DEFAULT_REAP_INTERVAL_SECS)]
    pub reap_interval_secs: u64,
    /// Lua script executed in the host's global environment at startup.
    pub init_script: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: defaults::default_socket_endpoint(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            reap_interval_secs: defaults::DEFAULT_REAP_INTERVAL_SECS,
            init_script: None,
        }
    }
}

impl Config {
    /// Endpoint the host listens on.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Interval between reaper sweeps, clamped to between one second and
    /// [`MAX_REAP_INTERVAL_SECS`].
    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.clamp(1, MAX_REAP_INTERVAL_SECS))
    }

    /// Optional init script path.
    #[must_use]
    pub fn init_script(&self) -> Option<&camino::Utf8Path> {
        self.init_script.as_deref()
    }
}
