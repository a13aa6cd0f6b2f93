//! Command-line client for the Conduit scripting host.
//!
//! The binary delegates to [`conduit_cli::run`], which loads configuration,
//! negotiates the protocol version with the host, and streams code fragments
//! to it over the configured listener socket.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    conduit_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
