//! Embedded Lua host that evaluates client code fragments.
//!
//! The host owns one Lua state shared by every session. Fragments are tried
//! first as an expression (`return <code>`) and then as a statement block;
//! when both fail to compile the statement block's error is reported. Values
//! are rendered with Lua's own `tostring`.
//!
//! Session environments give each client its own `_cli` descriptor and
//! `print`, while every other name reads from and writes to the host globals.

mod environment;
mod preparser;
mod render;

use std::fs;
use std::io;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use mlua::{Function, Lua, MultiValue, Table};
use thiserror::Error;
use tracing::debug;

pub use self::environment::{ExecutionEnvironment, SessionBinding};
pub use self::preparser::PREPARSER_GLOBAL;

use crate::console::{OutputRouter, OutputSink};

/// Tracing target for evaluation.
pub(crate) const EVAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::evaluator");

/// Chunk name reported in Lua error messages for client fragments.
const CHUNK_NAME: &str = "=conduit";

/// Result of evaluating one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// The fragment ran; holds every returned value rendered as text.
    Returned(Vec<String>),
    /// The fragment failed to compile or raised; holds the error message.
    Failed(String),
}

impl EvalOutcome {
    /// Whether the fragment ran to completion.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Returned(_))
    }

    /// Values joined with tabs. A failure renders as its message.
    #[must_use]
    pub fn joined(&self) -> String {
        match self {
            Self::Returned(values) => values.join("\t"),
            Self::Failed(message) => message.clone(),
        }
    }

    /// [`Self::joined`] with a trailing newline when non-empty.
    #[must_use]
    pub fn formatted(&self) -> String {
        let mut text = self.joined();
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

/// Errors raised while preparing the Lua host.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Installing host bindings failed.
    #[error("failed to prepare Lua state: {0}")]
    Setup(#[source] mlua::Error),
    /// The init script could not be read.
    #[error("failed to read init script '{path}': {source}")]
    ReadInitScript {
        /// Configured script path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The init script failed to compile or raised.
    #[error("init script '{path}' failed: {message}")]
    InitScript {
        /// Configured script path.
        path: Utf8PathBuf,
        /// Lua error message.
        message: String,
    },
    /// A session environment could not be built.
    #[error("failed to build environment for session '{id}': {source}")]
    Environment {
        /// Session identifier.
        id: String,
        /// Underlying Lua error.
        #[source]
        source: mlua::Error,
    },
    /// A session environment could not be retrieved.
    #[error("session environment is no longer available: {0}")]
    StaleEnvironment(#[source] mlua::Error),
}

/// The embedded Lua state and its output routing.
pub struct LuaHost {
    lua: Lua,
    router: Rc<OutputRouter>,
}

impl LuaHost {
    /// Creates a Lua state whose global `print` writes to `router`.
    pub fn new(router: Rc<OutputRouter>) -> Result<Self, EvalError> {
        let lua = Lua::new();
        render::install(&lua).map_err(EvalError::Setup)?;
        let print = {
            let router = Rc::clone(&router);
            render::line_printer(&lua, move |line| router.emit(line))
        }
        .map_err(EvalError::Setup)?;
        lua.globals()
            .set("print", print)
            .map_err(EvalError::Setup)?;
        Ok(Self { lua, router })
    }

    /// Output routing shared with the host's `print`.
    #[must_use]
    pub fn router(&self) -> &Rc<OutputRouter> {
        &self.router
    }

    /// The host global environment.
    #[must_use]
    pub fn globals(&self) -> Table<'_> {
        self.lua.globals()
    }

    /// Executes `path` in the global environment.
    pub fn run_init_script(&self, path: &Utf8Path) -> Result<(), EvalError> {
        let source = fs::read_to_string(path).map_err(|source| EvalError::ReadInitScript {
            path: path.to_path_buf(),
            source,
        })?;
        self.lua
            .load(source.as_str())
            .set_name(format!("@{path}"))
            .exec()
            .map_err(|error| EvalError::InitScript {
                path: path.to_path_buf(),
                message: render::describe_error(&error),
            })
    }

    /// Builds the binding table for a new session.
    pub fn create_environment(
        &self,
        binding: &SessionBinding<'_>,
    ) -> Result<ExecutionEnvironment, EvalError> {
        // Release registry slots held by sessions that have since been dropped.
        self.lua.expire_registry_values();
        environment::build(&self.lua, &self.router, binding).map_err(|source| {
            EvalError::Environment {
                id: binding.id.to_owned(),
                source,
            }
        })
    }

    /// Resolves a session's binding table.
    pub fn environment_table(
        &self,
        environment: &ExecutionEnvironment,
    ) -> Result<Table<'_>, EvalError> {
        environment
            .table(&self.lua)
            .map_err(EvalError::StaleEnvironment)
    }

    /// Evaluates `code` against `environment` under protected execution.
    ///
    /// The pre-parser hook runs first. Faults are captured in the outcome
    /// rather than returned as errors.
    pub fn evaluate<'lua>(&'lua self, code: &str, environment: Table<'lua>) -> EvalOutcome {
        let code = preparser::apply(&self.lua, code);
        let function = match self.compile(&code, environment) {
            Ok(function) => function,
            Err(error) => {
                debug!(target: EVAL_TARGET, error = %error, "fragment failed to compile");
                return EvalOutcome::Failed(render::describe_error(&error));
            }
        };
        match function
            .call::<_, MultiValue>(())
            .and_then(|values| render::render_values(&self.lua, values))
        {
            Ok(values) => EvalOutcome::Returned(values),
            Err(error) => EvalOutcome::Failed(render::describe_error(&error)),
        }
    }

    /// Evaluates `code` against the host globals.
    pub fn evaluate_global(&self, code: &str) -> EvalOutcome {
        self.evaluate(code, self.lua.globals())
    }

    fn compile<'lua>(
        &'lua self,
        code: &str,
        environment: Table<'lua>,
    ) -> mlua::Result<Function<'lua>> {
        let expression = format!("return {code}");
        self.lua
            .load(expression.as_str())
            .set_name(CHUNK_NAME)
            .set_environment(environment.clone())
            .into_function()
            .or_else(|_| {
                self.lua
                    .load(code)
                    .set_name(CHUNK_NAME)
                    .set_environment(environment)
                    .into_function()
            })
    }
}
