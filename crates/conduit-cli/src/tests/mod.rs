//! Test suites for the client runtime.

#[cfg(unix)]
mod session_flow;
#[cfg(unix)]
mod support;
