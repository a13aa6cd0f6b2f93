//! Lua scripting host for the Conduit command-line client.
//!
//! `conduitd` embeds one Lua state and serves `(tag, payload)` requests
//! arriving on a well-known socket. Clients either evaluate one-shot legacy
//! fragments or register a session: the host then opens a reverse channel to
//! the client, binds a session environment that shares the host globals, and
//! evaluates command and query fragments against it. Output printed on the
//! host console can be mirrored to sessions that ask for it, and a periodic
//! reaper drops sessions whose client has gone away.
//!
//! All host state lives on one control loop. Listener threads forward
//! requests to it and wait for its reply, so Lua code never runs
//! concurrently.

mod bootstrap;
mod channel;
mod console;
mod dispatch;
mod evaluator;
mod health;
mod host_loop;
mod process;
mod reaper;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, Bootstrapped, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use channel::{Channel, ChannelError, Transport};
pub use console::{
    CaptureSink, ConsoleBroadcaster, ConsoleWriter, OutputRouter, OutputSink, SinkGuard,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use evaluator::{
    EvalError, EvalOutcome, ExecutionEnvironment, LuaHost, PREPARSER_GLOBAL, SessionBinding,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use reaper::Reaper;
pub use session::{ConsoleMode, RegistrationArgs, Registry, Session};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::SocketTransport;

#[cfg(test)]
mod tests;
