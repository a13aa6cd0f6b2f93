//! Command-line client runtime for the Conduit scripting host.
//!
//! The module owns argument parsing, configuration bootstrapping, protocol
//! negotiation and the session conversation with the host. IO streams and
//! the configuration loader are injected so tests can drive the runtime
//! against a fake host.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use conduit_config::Config;

mod cli;
mod config;
mod errors;
mod fragments;
#[cfg(unix)]
mod reverse;
mod session;
mod transport;

pub(crate) use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use fragments::FragmentSource;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `conduit_config::Config`
/// that make sense on the client side.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--daemon-socket",
    "--log-filter",
    "--log-format",
];

/// Bundles the output streams provided to the client runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, R: BufRead, W: Write, E: Write, L: ConfigLoader> {
    stdin: &'a mut R,
    io: IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, R, W, E, L> CliRunner<'a, R, W, E, L>
where
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdin: &'a mut R, io: IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { stdin, io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(&cli_arguments) {
            Ok(cli) => cli,
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.io.stdout, "{error}");
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let program = cli_arguments.first().map_or_else(
            || "conduit".to_owned(),
            |name| name.to_string_lossy().into_owned(),
        );
        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.converse(&config, cli, &program));

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => self.fail(&error),
        }
    }

    fn converse(
        &mut self,
        config: &Config,
        cli: Cli,
        program: &str,
    ) -> Result<ExitCode, AppError> {
        let registration = cli.registration_args(program);
        let mut fragments = FragmentSource::new(cli.code, &mut *self.stdin);
        if session::probe(config.daemon_socket())? {
            session::run_session(config, &registration, &mut fragments, &mut self.io)
        } else {
            session::run_legacy(config.daemon_socket(), &mut fragments, &mut self.io)
        }
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.io.stderr, "{error}");
        ExitCode::FAILURE
    }
}

/// Runs the client using the provided arguments and IO handles.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdin, IoStreams::new(stdout, stderr), &OrthoConfigLoader)
}

/// Runs the client with a custom configuration loader.
pub(crate) fn run_with_loader<I, R, W, E, L>(
    args: I,
    stdin: &mut R,
    io: IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdin, io, loader).run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = args.first().cloned().into_iter().collect();
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

#[cfg(test)]
mod tests;
