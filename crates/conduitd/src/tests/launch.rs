//! End-to-end launch over a Unix socket.

#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use conduit_config::{Config, RuntimePaths, SocketEndpoint};
use conduit_protocol::{
    InboundFrame, MessageTag, OutboundFrame, ReplyFrame, VERSION_TOKEN, decode_line, encode_line,
    join_fields,
};

use super::support::ConsoleLines;
use crate::bootstrap::{BootstrapError, StaticConfigLoader};
use crate::health::HealthReporter;
use crate::host_loop::LoopExit;
use crate::process::{LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, run_daemon_with};

#[derive(Debug, Default)]
struct RecordingReporter {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingReporter {
    fn record(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("events lock").clone()
    }
}

impl HealthReporter for RecordingReporter {
    fn bootstrap_starting(&self) {
        self.record("bootstrap_starting");
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record("bootstrap_succeeded");
    }

    fn bootstrap_failed(&self, _error: &BootstrapError) {
        self.record("bootstrap_failed");
    }

    fn host_ready(&self, _endpoint: &SocketEndpoint) {
        self.record("host_ready");
    }

    fn host_stopped(&self) {
        self.record("host_stopped");
    }
}

/// Hands the stop flag back to the test.
#[derive(Debug, Clone, Default)]
struct ManualShutdown {
    flag: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl ManualShutdown {
    fn trigger(&self) {
        if let Some(flag) = self.flag.lock().expect("flag lock").as_ref() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

impl ShutdownSignal for ManualShutdown {
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        *self.flag.lock().expect("flag lock") = Some(Arc::clone(stop));
        Ok(())
    }
}

fn config_in(dir: &tempfile::TempDir) -> Config {
    let socket = Utf8PathBuf::from_path_buf(dir.path().join("conduitd.sock")).expect("utf8 path");
    Config {
        daemon_socket: SocketEndpoint::unix(socket),
        log_filter: "off".to_owned(),
        ..Config::default()
    }
}

fn launch(
    config: Config,
    reporter: Arc<RecordingReporter>,
    shutdown: ManualShutdown,
) -> thread::JoinHandle<Result<LoopExit, LaunchError>> {
    thread::spawn(move || {
        run_daemon_with(LaunchPlan {
            loader: StaticConfigLoader::new(config),
            reporter,
            shutdown,
            console: Rc::new(ConsoleLines::default()),
        })
    })
}

fn connect_when_ready(path: &Utf8PathBuf) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return stream,
            Err(error) if Instant::now() >= deadline => panic!("host never listened: {error}"),
            Err(_) => thread::sleep(Duration::from_millis(20)),
        }
    }
}

fn request(path: &Utf8PathBuf, tag: MessageTag, payload: &str) -> ReplyFrame {
    let mut stream = connect_when_ready(path);
    let frame = InboundFrame {
        tag: tag.code(),
        payload: payload.to_owned(),
    };
    stream
        .write_all(&encode_line(&frame).expect("encode request"))
        .expect("write request");
    let mut line = String::new();
    BufReader::new(stream)
        .read_line(&mut line)
        .expect("read reply");
    decode_line(line.as_bytes()).expect("decode reply")
}

#[test]
fn host_serves_a_session_over_sockets() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_in(&dir);
    let socket = config
        .daemon_socket()
        .unix_path()
        .expect("unix socket")
        .to_path_buf();
    let paths = RuntimePaths::from_config(&config).expect("runtime paths");
    let reporter = Arc::new(RecordingReporter::default());
    let shutdown = ManualShutdown::default();
    let host = launch(config, Arc::clone(&reporter), shutdown.clone());

    assert_eq!(
        request(&socket, MessageTag::VersionProbe, ""),
        ReplyFrame::Reply(Some(VERSION_TOKEN.to_owned()))
    );

    let reverse_path = paths.session_socket("cli-1").expect("session socket");
    let reverse = UnixListener::bind(&reverse_path).expect("bind reverse socket");
    assert_eq!(
        request(&socket, MessageTag::Register, &join_fields("cli-1", r#"["conduit"]"#)),
        ReplyFrame::Reply(None)
    );
    let (peer, _) = reverse.accept().expect("host connects back");

    assert_eq!(
        request(&socket, MessageTag::Command, &join_fields("cli-1", "1+1")),
        ReplyFrame::Reply(Some("ok".to_owned()))
    );
    let mut line = String::new();
    BufReader::new(peer)
        .read_line(&mut line)
        .expect("read reverse frame");
    let frame: OutboundFrame = decode_line(line.as_bytes()).expect("decode frame");
    assert_eq!(frame.tag, MessageTag::Return.code());
    assert_eq!(frame.payload, "2\n");

    shutdown.trigger();
    let exit = host.join().expect("join host").expect("host run");
    assert_eq!(exit, LoopExit::Stopped);
    assert!(!socket.exists(), "listener socket removed on shutdown");
    assert_eq!(
        reporter.events(),
        vec![
            "bootstrap_starting",
            "bootstrap_succeeded",
            "host_ready",
            "host_stopped"
        ]
    );
}

#[test]
fn bootstrap_failure_is_reported_and_returned() {
    let config = Config {
        daemon_socket: SocketEndpoint::unix("conduitd.sock"),
        log_filter: "off".to_owned(),
        ..Config::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let result = launch(config, Arc::clone(&reporter), ManualShutdown::default())
        .join()
        .expect("join host");

    assert!(matches!(
        result,
        Err(LaunchError::Bootstrap {
            source: BootstrapError::Socket { .. }
        })
    ));
    assert_eq!(
        reporter.events(),
        vec!["bootstrap_starting", "bootstrap_failed"]
    );
}
