use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match conduitd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "conduitd: {error}");
            ExitCode::FAILURE
        }
    }
}
