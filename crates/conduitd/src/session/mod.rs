//! Client sessions and the registry that owns them.
//!
//! A session is created by a Register message and lives until the client
//! unregisters or the reaper notices its reverse channel has gone away. The
//! [`Registry`] is the only owner of [`Session`] records; other components
//! borrow it for the duration of a single dispatch.

mod arguments;
mod registry;

use std::fmt;
use std::rc::Rc;

pub use self::arguments::RegistrationArgs;
pub use self::registry::Registry;

use crate::channel::Channel;
use crate::evaluator::ExecutionEnvironment;

/// Tracing target for session lifecycle events.
pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// How a session relates to output printed on the host console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleMode {
    /// Host console output is not forwarded.
    #[default]
    None,
    /// Host console output is mirrored over the reverse channel.
    Mirror,
    /// The session's own prints are also written to the host console.
    Legacy,
}

impl ConsoleMode {
    /// Name exposed to scripts through `_cli.console`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mirror => "mirror",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for ConsoleMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One registered client instance.
pub struct Session {
    id: String,
    reverse_channel: Option<Rc<dyn Channel>>,
    args: RegistrationArgs,
    environment: ExecutionEnvironment,
}

impl Session {
    /// Assembles a session from its registration parts.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        args: RegistrationArgs,
        reverse_channel: Option<Rc<dyn Channel>>,
        environment: ExecutionEnvironment,
    ) -> Self {
        Self {
            id: id.into(),
            reverse_channel,
            args,
            environment,
        }
    }

    /// Registry key supplied by the client.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Channel back to the client, if one could be opened.
    #[must_use]
    pub fn reverse_channel(&self) -> Option<&Rc<dyn Channel>> {
        self.reverse_channel.as_ref()
    }

    /// Console forwarding mode.
    #[must_use]
    pub fn console_mode(&self) -> ConsoleMode {
        self.args.console_mode
    }

    /// Whether console forwarding is suppressed.
    #[must_use]
    pub fn quiet(&self) -> bool {
        self.args.quiet
    }

    /// Arguments intended for the client's script.
    #[must_use]
    pub fn script_args(&self) -> &[String] {
        &self.args.script_args
    }

    /// The full argument list sent at registration.
    #[must_use]
    pub fn raw_args(&self) -> &[String] {
        &self.args.raw_args
    }

    /// The session-scoped binding table.
    #[must_use]
    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    /// Whether host console output should be forwarded to this session.
    #[must_use]
    pub fn receives_console(&self) -> bool {
        self.console_mode() == ConsoleMode::Mirror && !self.quiet()
    }

    /// Whether the session still has a usable reverse channel.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.reverse_channel
            .as_ref()
            .is_some_and(|channel| channel.is_valid())
    }

    /// Deletes the reverse channel, if any.
    pub fn close(&self) {
        if let Some(channel) = &self.reverse_channel {
            channel.delete();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("id", &self.id)
            .field("has_channel", &self.reverse_channel.is_some())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
