//! Launch sequencing for the host process.

use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::console::{ConsoleWriter, OutputSink};
use crate::dispatch::Dispatcher;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::host_loop::{HostLoop, LoopExit};
use crate::reaper::Reaper;
use crate::transport::{ForwardingHandler, SocketListener, SocketTransport};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::PROCESS_TARGET;

/// Collaborators needed to launch the host.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) console: Rc<dyn OutputSink>,
}

/// Runs the host in the foreground until a termination signal arrives.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        console: Rc::new(ConsoleWriter::stdout()),
    })
    .map(|_| ())
}

/// Runs the host with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<LoopExit, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        console,
    } = plan;

    let (config, paths) = bootstrap_with(&loader, &reporter)?.into_parts();
    let dispatcher = Dispatcher::assemble(
        console,
        Box::new(SocketTransport::new(paths)),
        config.init_script(),
    )?;
    let reaper = Reaper::new(Rc::clone(dispatcher.registry()), config.reap_interval());

    let stop = Arc::new(AtomicBool::new(false));
    shutdown.install(&stop)?;

    let listener = SocketListener::bind(config.daemon_socket())?;
    let (inbox, requests) = mpsc::channel();
    let listener_handle = listener.start(Arc::new(ForwardingHandler::new(inbox)))?;
    reporter.host_ready(config.daemon_socket());

    let mut host_loop = HostLoop::new(dispatcher, reaper, requests, stop);
    let exit = host_loop.run();
    host_loop.close_sessions();

    listener_handle.shutdown();
    listener_handle.join()?;
    reporter.host_stopped();
    info!(target: PROCESS_TARGET, ?exit, "shutdown sequence completed");
    Ok(exit)
}
