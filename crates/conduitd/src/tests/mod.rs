//! Test suites for the Conduit host.

mod launch;
mod support;
