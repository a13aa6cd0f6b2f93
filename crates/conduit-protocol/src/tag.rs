//! Fixed message tags.

use std::fmt;

use thiserror::Error;

/// Message tags understood on either side of the protocol.
///
/// The discriminants are the integers carried on the wire and must never
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageTag {
    /// Pre-versioning one-shot evaluation without a session.
    Legacy = 0,
    /// Creates or replaces a session.
    Register = 100,
    /// Removes a session.
    Unregister = 200,
    /// Evaluates code, replying on the reverse channel and acknowledging
    /// synchronously.
    Command = 500,
    /// Evaluates code, replying synchronously only.
    Query = 501,
    /// Distinguishes a session-aware host from a legacy one.
    VersionProbe = 900,
    /// Evaluation failed to compile or raised.
    Error = -1,
    /// Output printed by the session's own code.
    Output = 1,
    /// Evaluation succeeded.
    Return = 2,
    /// Mirror of output printed on the host console.
    Console = 3,
}

impl MessageTag {
    /// Integer carried on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Whether the tag names a request the host handles.
    #[must_use]
    pub const fn is_inbound(self) -> bool {
        matches!(
            self,
            Self::Legacy
                | Self::Register
                | Self::Unregister
                | Self::Command
                | Self::Query
                | Self::VersionProbe
        )
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Command => "command",
            Self::Query => "query",
            Self::VersionProbe => "version_probe",
            Self::Error => "error",
            Self::Output => "output",
            Self::Return => "return",
            Self::Console => "console",
        }
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Raised when an integer does not correspond to any [`MessageTag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown message tag {code}")]
pub struct UnknownTag {
    /// The unrecognised integer.
    pub code: i32,
}

impl TryFrom<i32> for MessageTag {
    type Error = UnknownTag;

    fn try_from(code: i32) -> Result<Self, UnknownTag> {
        let tag = match code {
            0 => Self::Legacy,
            100 => Self::Register,
            200 => Self::Unregister,
            500 => Self::Command,
            501 => Self::Query,
            900 => Self::VersionProbe,
            -1 => Self::Error,
            1 => Self::Output,
            2 => Self::Return,
            3 => Self::Console,
            _ => return Err(UnknownTag { code }),
        };
        Ok(tag)
    }
}
