//! CLI argument definitions for the Conduit client.

use clap::Parser;

/// Command-line client for the Conduit scripting host.
///
/// Without `-c` each line read from stdin is submitted as one fragment.
#[derive(Parser, Debug)]
#[command(name = "conduit", version)]
pub(crate) struct Cli {
    /// Suppresses mirrored host console output for this session.
    #[arg(short = 'q')]
    pub(crate) quiet: bool,
    /// Mirrors everything the host prints to this session.
    #[arg(short = 'C', overrides_with = "legacy_console")]
    pub(crate) mirror_console: bool,
    /// Echoes this session's prints to the host console as well.
    #[arg(short = 'P', overrides_with = "mirror_console")]
    pub(crate) legacy_console: bool,
    /// Code to evaluate; may be repeated.
    #[arg(short = 'c', value_name = "CODE")]
    pub(crate) code: Vec<String>,
    /// Arguments exposed to evaluated code through `_cli.args`.
    #[arg(
        value_name = "ARG",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) script_args: Vec<String>,
}

impl Cli {
    /// Argument list announced to the host at registration.
    ///
    /// Flags are re-emitted in the spelling the host recognises. Script
    /// arguments follow a `--` separator unless they already begin with a
    /// path-like token.
    pub(crate) fn registration_args(&self, program: &str) -> Vec<String> {
        let mut args = vec![program.to_owned()];
        if self.quiet {
            args.push("-q".to_owned());
        }
        if self.mirror_console {
            args.push("-C".to_owned());
        } else if self.legacy_console {
            args.push("-P".to_owned());
        }
        if let Some(first) = self.script_args.first() {
            if !first.starts_with(['~', '.', '/']) {
                args.push("--".to_owned());
            }
            args.extend(self.script_args.iter().cloned());
        }
        args
    }
}
