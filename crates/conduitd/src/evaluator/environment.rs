//! Session-scoped execution environments.
//!
//! Each environment is a table whose metatable sends both reads and writes of
//! unbound names to the host globals. Only `_cli` and `print` are bound on
//! the table itself, so sessions share every other global with the host and
//! with each other.

use std::rc::{Rc, Weak};

use conduit_protocol::MessageTag;
use mlua::{Lua, RegistryKey, Table};
use tracing::debug;

use super::{EVAL_TARGET, render};
use crate::channel::Channel;
use crate::console::{OutputRouter, OutputSink};
use crate::session::{ConsoleMode, RegistrationArgs};

/// Handle to a session's binding table held in the Lua registry.
#[derive(Debug)]
pub struct ExecutionEnvironment {
    key: RegistryKey,
}

impl ExecutionEnvironment {
    pub(super) fn table<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Table<'lua>> {
        lua.registry_value(&self.key)
    }
}

/// What a session environment exposes to scripts.
pub struct SessionBinding<'a> {
    /// Session identifier, exposed as `_cli.id`.
    pub id: &'a str,
    /// Parsed registration arguments.
    pub args: &'a RegistrationArgs,
    /// Reverse channel that session `print` writes to.
    pub channel: Option<&'a Rc<dyn Channel>>,
}

pub(super) fn build(
    lua: &Lua,
    router: &Rc<OutputRouter>,
    binding: &SessionBinding<'_>,
) -> mlua::Result<ExecutionEnvironment> {
    let globals = lua.globals();
    let metatable = lua.create_table()?;
    metatable.set("__index", globals.clone())?;
    metatable.set("__newindex", globals)?;

    let table = lua.create_table()?;
    table.set_metatable(Some(metatable));
    table.raw_set("_cli", descriptor(lua, binding)?)?;
    table.raw_set("print", session_printer(lua, router, binding)?)?;

    let key = lua.create_registry_value(table)?;
    Ok(ExecutionEnvironment { key })
}

fn descriptor<'lua>(lua: &'lua Lua, binding: &SessionBinding<'_>) -> mlua::Result<Table<'lua>> {
    let args = binding.args;
    let cli = lua.create_table()?;
    cli.set("id", binding.id)?;
    cli.set(
        "args",
        lua.create_sequence_from(args.script_args.iter().map(String::as_str))?,
    )?;
    cli.set(
        "_args",
        lua.create_sequence_from(args.raw_args.iter().map(String::as_str))?,
    )?;
    cli.set("quiet", args.quiet)?;
    cli.set("console", args.console_mode.as_str())?;
    Ok(cli)
}

fn session_printer<'lua>(
    lua: &'lua Lua,
    router: &Rc<OutputRouter>,
    binding: &SessionBinding<'_>,
) -> mlua::Result<mlua::Function<'lua>> {
    let channel: Option<Weak<dyn Channel>> = binding.channel.map(Rc::downgrade);
    let console = (binding.args.console_mode == ConsoleMode::Legacy).then(|| Rc::clone(router));
    let id = binding.id.to_owned();

    render::line_printer(lua, move |line| {
        if let Some(channel) = channel.as_ref().and_then(Weak::upgrade)
            && let Err(error) = channel.send(&format!("{line}\n"), MessageTag::Output)
        {
            debug!(
                target: EVAL_TARGET,
                session = %id,
                error = %error,
                "failed to deliver session output"
            );
        }
        if let Some(router) = &console {
            router.emit(line);
        }
    })
}
