//! Registration argument parsing.

use super::ConsoleMode;

/// Flags and arguments extracted from a Register payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationArgs {
    /// `-q` was present before the separator.
    pub quiet: bool,
    /// Mode selected by `-C` or `-P`; the last flag wins.
    pub console_mode: ConsoleMode,
    /// Arguments from the separator onwards, or the full list when no
    /// separator was present.
    pub script_args: Vec<String>,
    /// The complete argument list as sent.
    pub raw_args: Vec<String>,
}

impl RegistrationArgs {
    /// Decodes the optional JSON argument array of a Register payload.
    ///
    /// An absent field is an empty argument list.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the field is not a JSON array of
    /// strings.
    pub fn decode(field: Option<&str>) -> Result<Self, serde_json::Error> {
        let raw_args = match field {
            Some(json) => serde_json::from_str::<Vec<String>>(json)?,
            None => Vec::new(),
        };
        Ok(Self::parse(raw_args))
    }

    /// Scans `raw_args`, skipping the program name at index 0.
    #[must_use]
    pub fn parse(raw_args: Vec<String>) -> Self {
        let mut quiet = false;
        let mut console_mode = ConsoleMode::None;
        let mut separator = None;

        for (index, arg) in raw_args.iter().enumerate().skip(1) {
            if is_separator(arg) {
                separator = Some(index);
                break;
            }
            match arg.as_str() {
                "-q" => quiet = true,
                "-C" => console_mode = ConsoleMode::Mirror,
                "-P" => console_mode = ConsoleMode::Legacy,
                _ => {}
            }
        }

        let script_args = match separator {
            Some(index) => raw_args.get(index..).map(<[String]>::to_vec).unwrap_or_default(),
            None => raw_args.clone(),
        };

        Self {
            quiet,
            console_mode,
            script_args,
            raw_args,
        }
    }
}

/// Whether `arg` ends flag collection: `--`, or a path-like token starting
/// with `~`, `.` or `/`.
fn is_separator(arg: &str) -> bool {
    arg == "--" || arg.starts_with(['~', '.', '/'])
}
