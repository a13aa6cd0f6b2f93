//! Sources of code fragments submitted to the host.

use std::io::BufRead;
use std::vec;

use crate::AppError;

/// Yields fragments from `-c` flags or, when none were given, from stdin
/// one line at a time.
pub(crate) enum FragmentSource<'a, R: BufRead> {
    Inline(vec::IntoIter<String>),
    Lines(&'a mut R),
}

impl<'a, R: BufRead> FragmentSource<'a, R> {
    pub(crate) fn new(code: Vec<String>, stdin: &'a mut R) -> Self {
        if code.is_empty() {
            Self::Lines(stdin)
        } else {
            Self::Inline(code.into_iter())
        }
    }

    /// Next fragment to submit. Blank stdin lines are skipped.
    pub(crate) fn next_fragment(&mut self) -> Result<Option<String>, AppError> {
        match self {
            Self::Inline(code) => Ok(code.next()),
            Self::Lines(reader) => loop {
                let mut line = String::new();
                if reader.read_line(&mut line).map_err(AppError::ReadInput)? == 0 {
                    return Ok(None);
                }
                let fragment = line.trim_end_matches(['\r', '\n']);
                if !fragment.trim().is_empty() {
                    return Ok(Some(fragment.to_owned()));
                }
            },
        }
    }
}
