//! Optional rewrite hook applied to code before compilation.

use std::borrow::Cow;

use mlua::{Lua, Value};
use tracing::warn;

use super::EVAL_TARGET;

/// Global consulted for the pre-parser hook.
///
/// `nil` disables the hook. A function receives the code and must return the
/// rewritten code as a string.
pub const PREPARSER_GLOBAL: &str = "_consoleInputPreparser";

/// Runs the hook over `code`. Misconfiguration and faults are logged and the
/// original code is used.
pub(super) fn apply<'a>(lua: &Lua, code: &'a str) -> Cow<'a, str> {
    let hook = match lua.globals().get::<_, Value>(PREPARSER_GLOBAL) {
        Ok(hook) => hook,
        Err(error) => {
            warn!(target: EVAL_TARGET, error = %error, "failed to read pre-parser hook");
            return Cow::Borrowed(code);
        }
    };

    let function = match hook {
        Value::Nil => return Cow::Borrowed(code),
        Value::Function(function) => function,
        other => {
            warn!(
                target: EVAL_TARGET,
                kind = other.type_name(),
                "pre-parser hook is not callable; skipping"
            );
            return Cow::Borrowed(code);
        }
    };

    match function.call::<_, Value>(code) {
        Ok(Value::String(rewritten)) => match rewritten.to_str() {
            Ok(text) => Cow::Owned(text.to_owned()),
            Err(error) => {
                warn!(target: EVAL_TARGET, error = %error, "pre-parser returned invalid UTF-8");
                Cow::Borrowed(code)
            }
        },
        Ok(other) => {
            warn!(
                target: EVAL_TARGET,
                kind = other.type_name(),
                "pre-parser returned a non-string; using original code"
            );
            Cow::Borrowed(code)
        }
        Err(error) => {
            warn!(target: EVAL_TARGET, error = %error, "pre-parser hook failed");
            Cow::Borrowed(code)
        }
    }
}
