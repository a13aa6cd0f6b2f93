//! Test support for the client runtime.
//!
//! [`FakeHost`] speaks just enough of the host protocol over a Unix socket in
//! a temporary directory to exercise both the session and legacy paths.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Cursor, ErrorKind, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::Utf8PathBuf;
use conduit_config::{Config, RuntimePaths, SocketEndpoint};
use conduit_protocol::{
    ACK_ERROR, ACK_OK, InboundFrame, MessageTag, OutboundFrame, ReplyFrame, VERSION_TOKEN,
    decode_line, encode_line, split_fields,
};
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Which protocol the fake host speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HostFlavour {
    /// Answers the probe with the version token and keeps sessions.
    Session,
    /// Replies `legacy:<payload>` to everything, like a pre-versioning host.
    Legacy,
    /// Speaks the session protocol but rejects every registration.
    RejectsRegistration,
}

pub(super) struct FakeHost {
    dir: TempDir,
    config: Config,
    requests: Arc<Mutex<Vec<InboundFrame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeHost {
    pub(super) fn spawn(flavour: HostFlavour) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let socket = Utf8PathBuf::from_path_buf(dir.path().join("conduitd.sock"))
            .expect("utf8 socket path");
        let config = Config {
            daemon_socket: SocketEndpoint::unix(socket.clone()),
            ..Config::default()
        };
        let paths = RuntimePaths::from_config(&config).expect("runtime paths");
        let listener = UnixListener::bind(socket.as_std_path()).expect("bind fake host");
        listener.set_nonblocking(true).expect("nonblocking listener");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let mut state = HostState {
            flavour,
            paths,
            reverse: HashMap::new(),
            requests: Arc::clone(&requests),
        };
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => state.serve(stream),
                    Err(error) if error.kind() == ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => return,
                }
            }
        });

        Self {
            dir,
            config,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub(super) fn config(&self) -> Config {
        self.config.clone()
    }

    pub(super) fn requests(&self) -> Vec<InboundFrame> {
        self.requests.lock().expect("lock requests").clone()
    }

    pub(super) fn tags(&self) -> Vec<i32> {
        self.requests().iter().map(|frame| frame.tag).collect()
    }

    /// Registration arguments of the first Register request.
    pub(super) fn registered_args(&self) -> Vec<String> {
        let register = self
            .requests()
            .into_iter()
            .find(|frame| frame.tag == MessageTag::Register.code())
            .expect("register request");
        let (_, args) = split_fields(&register.payload);
        serde_json::from_str(args.expect("argument field")).expect("argument json")
    }

    /// Files left in the sessions directory.
    pub(super) fn leftover_session_sockets(&self) -> usize {
        std::fs::read_dir(self.dir.path().join("sessions"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for FakeHost {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct HostState {
    flavour: HostFlavour,
    paths: RuntimePaths,
    reverse: HashMap<String, UnixStream>,
    requests: Arc<Mutex<Vec<InboundFrame>>>,
}

impl HostState {
    fn serve(&mut self, stream: UnixStream) {
        stream.set_nonblocking(false).expect("blocking stream");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).expect("read request");
        let frame: InboundFrame = decode_line(&line).expect("decode request");
        self.requests
            .lock()
            .expect("lock requests")
            .push(frame.clone());
        let reply = self.respond(&frame);
        let mut writer = stream;
        writer
            .write_all(&encode_line(&reply).expect("encode reply"))
            .expect("write reply");
    }

    fn respond(&mut self, frame: &InboundFrame) -> ReplyFrame {
        if self.flavour == HostFlavour::Legacy {
            return ReplyFrame::Reply(Some(format!("legacy:{}", frame.payload)));
        }
        match MessageTag::try_from(frame.tag) {
            Ok(MessageTag::VersionProbe) => ReplyFrame::Reply(Some(VERSION_TOKEN.to_owned())),
            Ok(MessageTag::Register) if self.flavour == HostFlavour::RejectsRegistration => {
                ReplyFrame::Error("bad arguments".to_owned())
            }
            Ok(MessageTag::Register) => {
                let (id, _) = split_fields(&frame.payload);
                let path = self.paths.session_socket(id).expect("session socket");
                let stream = UnixStream::connect(path.as_std_path()).expect("connect reverse");
                self.reverse.insert(id.to_owned(), stream);
                ReplyFrame::Reply(None)
            }
            Ok(MessageTag::Command) => {
                let (id, code) = split_fields(&frame.payload);
                let code = code.unwrap_or_default();
                let Some(channel) = self.reverse.get_mut(id) else {
                    return ReplyFrame::Reply(None);
                };
                if code.starts_with("fail") {
                    send(channel, MessageTag::Error, &format!("boom: {code}\n"));
                    ReplyFrame::Reply(Some(ACK_ERROR.to_owned()))
                } else {
                    send(channel, MessageTag::Output, &format!("out:{code}\n"));
                    send(channel, MessageTag::Return, &format!("{code}\n"));
                    ReplyFrame::Reply(Some(ACK_OK.to_owned()))
                }
            }
            Ok(MessageTag::Unregister) => {
                if let Some(channel) = self.reverse.remove(&frame.payload) {
                    let _ = channel.shutdown(Shutdown::Both);
                }
                ReplyFrame::Reply(None)
            }
            _ => ReplyFrame::Reply(None),
        }
    }
}

fn send(channel: &mut UnixStream, tag: MessageTag, payload: &str) {
    let frame = OutboundFrame {
        tag: tag.code(),
        payload: payload.to_owned(),
    };
    channel
        .write_all(&encode_line(&frame).expect("encode frame"))
        .expect("write frame");
}

/// Captured result of one client run.
pub(super) struct RunOutcome {
    pub(super) exit: ExitCode,
    pub(super) stdout: String,
    pub(super) stderr: String,
}

pub(super) fn run_client(config: Config, args: &[&str], stdin: &str) -> RunOutcome {
    let mut input = Cursor::new(stdin.to_owned());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let loader = StaticConfigLoader::new(config);
    let exit = run_with_loader(
        args.iter().map(OsString::from),
        &mut input,
        IoStreams::new(&mut stdout, &mut stderr),
        &loader,
    );
    RunOutcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}
