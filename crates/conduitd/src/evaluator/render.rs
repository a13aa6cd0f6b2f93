//! Value rendering and error text.

use mlua::{Function, Lua, MultiValue, Value};

/// Registry slot holding the pristine `tostring`, so scripts replacing the
/// global cannot change how results are rendered.
const TOSTRING_KEY: &str = "conduit.tostring";

const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Stashes the state's original `tostring`.
pub(super) fn install(lua: &Lua) -> mlua::Result<()> {
    let tostring: Function = lua.globals().get("tostring")?;
    lua.set_named_registry_value(TOSTRING_KEY, tostring)
}

/// Renders every value with `tostring`.
pub(super) fn render_values<'lua>(
    lua: &'lua Lua,
    values: MultiValue<'lua>,
) -> mlua::Result<Vec<String>> {
    let tostring: Function = lua.named_registry_value(TOSTRING_KEY)?;
    values
        .into_iter()
        .map(|value| render_value(&tostring, value))
        .collect()
}

fn render_value<'lua>(tostring: &Function<'lua>, value: Value<'lua>) -> mlua::Result<String> {
    let rendered: mlua::String = tostring.call(value)?;
    Ok(rendered.to_string_lossy().into_owned())
}

/// Builds a `print`-compatible function that tab-joins its arguments and
/// hands the line to `emit`.
pub(super) fn line_printer<'lua, F>(lua: &'lua Lua, emit: F) -> mlua::Result<Function<'lua>>
where
    F: Fn(&str) + 'static,
{
    lua.create_function(move |lua, values: MultiValue| {
        let line = render_values(lua, values)?.join("\t");
        emit(&line);
        Ok(())
    })
}

/// Message text for a Lua error, without Rust-side prefixes or tracebacks.
pub(super) fn describe_error(error: &mlua::Error) -> String {
    let message = match error {
        mlua::Error::SyntaxError { message, .. } | mlua::Error::RuntimeError(message) => {
            message.as_str()
        }
        mlua::Error::CallbackError { cause, .. } => return describe_error(cause),
        other => return other.to_string(),
    };
    message
        .split_once(TRACEBACK_MARKER)
        .map_or(message, |(head, _)| head)
        .to_owned()
}
