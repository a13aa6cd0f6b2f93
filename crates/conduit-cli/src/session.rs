//! Conversations with the host.
//!
//! A version probe decides between the session protocol and the legacy
//! one-shot protocol. Session mode registers a reverse channel, submits each
//! fragment as a Command and waits for its Return or Error frame on that
//! channel. Legacy mode sends each fragment with the legacy tag and prints
//! the synchronous reply.

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use conduit_config::{Config, RuntimePaths, SocketEndpoint};
use conduit_protocol::{MessageTag, OutboundFrame, ReplyFrame, VERSION_TOKEN, join_fields};

use crate::fragments::FragmentSource;
use crate::transport::request;
use crate::{AppError, IoStreams};

/// Flag character prefixed to legacy payloads. The host skips it.
const LEGACY_FLAG: char = 'x';

/// How long to wait for the host's reverse connection after registering.
const REVERSE_PATIENCE: Duration = Duration::from_secs(2);

static SESSION_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Whether the host answers the version probe with the session protocol
/// token. Any other reply marks a legacy host.
pub(crate) fn probe(endpoint: &SocketEndpoint) -> Result<bool, AppError> {
    let reply = request(endpoint, MessageTag::VersionProbe, "")?;
    Ok(matches!(reply, ReplyFrame::Reply(Some(token)) if token == VERSION_TOKEN))
}

/// Submits every fragment through the legacy protocol.
pub(crate) fn run_legacy<R, W, E>(
    endpoint: &SocketEndpoint,
    fragments: &mut FragmentSource<'_, R>,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    while let Some(code) = fragments.next_fragment()? {
        let payload = format!("{LEGACY_FLAG}{code}");
        match request(endpoint, MessageTag::Legacy, &payload)? {
            ReplyFrame::Reply(Some(text)) if !text.is_empty() => {
                write_payload(&mut *io.stdout, &text)?;
            }
            ReplyFrame::Reply(_) => {}
            ReplyFrame::Error(message) => return Err(AppError::Rejected(message)),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Registers a session, submits every fragment and unregisters.
///
/// The exit code reports failure when any fragment raised.
#[cfg(unix)]
pub(crate) fn run_session<R, W, E>(
    config: &Config,
    registration: &[String],
    fragments: &mut FragmentSource<'_, R>,
    io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    use crate::reverse::ReverseListener;

    let paths = RuntimePaths::from_config(config)?;
    paths.prepare()?;
    let session = Session {
        endpoint: config.daemon_socket(),
        id: next_session_id(),
    };
    let listener = ReverseListener::bind(&paths.session_socket(&session.id)?)?;
    session.register(registration)?;

    let channel = match listener.accept(REVERSE_PATIENCE) {
        Ok(channel) => channel,
        Err(error) => {
            let _ = session.unregister();
            return Err(error);
        }
    };

    let failures = session.submit_all(&channel, fragments, io);
    let unregistered = session.unregister();
    let failures = failures?;
    unregistered?;
    for frame in channel.finish() {
        render_frame(&frame, io)?;
    }

    if failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(not(unix))]
pub(crate) fn run_session<R, W, E>(
    config: &Config,
    _registration: &[String],
    _fragments: &mut FragmentSource<'_, R>,
    _io: &mut IoStreams<'_, W, E>,
) -> Result<ExitCode, AppError>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let _ = RuntimePaths::from_config(config)?;
    Err(AppError::UnsupportedUnixTransport(
        config.daemon_socket().to_string(),
    ))
}

fn next_session_id() -> String {
    let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("cli-{}-{sequence}", std::process::id())
}

struct Session<'a> {
    endpoint: &'a SocketEndpoint,
    id: String,
}

impl Session<'_> {
    fn register(&self, registration: &[String]) -> Result<(), AppError> {
        let args = serde_json::to_string(registration).map_err(AppError::EncodeArguments)?;
        let payload = join_fields(&self.id, &args);
        match request(self.endpoint, MessageTag::Register, &payload)? {
            ReplyFrame::Reply(_) => Ok(()),
            ReplyFrame::Error(message) => Err(AppError::Rejected(message)),
        }
    }

    fn unregister(&self) -> Result<(), AppError> {
        match request(self.endpoint, MessageTag::Unregister, &self.id)? {
            ReplyFrame::Reply(_) => Ok(()),
            ReplyFrame::Error(message) => Err(AppError::Rejected(message)),
        }
    }

    #[cfg(unix)]
    fn submit_all<R, W, E>(
        &self,
        channel: &crate::reverse::ReverseChannel,
        fragments: &mut FragmentSource<'_, R>,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<usize, AppError>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut failures = 0usize;
        while let Some(code) = fragments.next_fragment()? {
            if !self.submit(channel, &code, io)? {
                failures += 1;
            }
        }
        Ok(failures)
    }

    /// Sends one Command and renders frames until its result arrives.
    /// Returns whether the fragment evaluated successfully.
    #[cfg(unix)]
    fn submit<W, E>(
        &self,
        channel: &crate::reverse::ReverseChannel,
        code: &str,
        io: &mut IoStreams<'_, W, E>,
    ) -> Result<bool, AppError>
    where
        W: Write,
        E: Write,
    {
        match request(self.endpoint, MessageTag::Command, &join_fields(&self.id, code))? {
            ReplyFrame::Reply(Some(_)) => {}
            ReplyFrame::Reply(None) => {
                return Err(AppError::SessionUnknown {
                    id: self.id.clone(),
                });
            }
            ReplyFrame::Error(message) => return Err(AppError::Rejected(message)),
        }
        loop {
            let frame = channel.next_frame().ok_or(AppError::ReverseClosed)?;
            if let Some(succeeded) = render_frame(&frame, io)? {
                return Ok(succeeded);
            }
        }
    }
}

/// Writes a reverse channel frame to the matching stream. Returns the
/// fragment verdict for Return and Error frames.
pub(crate) fn render_frame<W, E>(
    frame: &OutboundFrame,
    io: &mut IoStreams<'_, W, E>,
) -> Result<Option<bool>, AppError>
where
    W: Write,
    E: Write,
{
    match MessageTag::try_from(frame.tag) {
        Ok(MessageTag::Output | MessageTag::Console) => {
            write_payload(&mut *io.stdout, &frame.payload)?;
            Ok(None)
        }
        Ok(MessageTag::Return) => {
            write_payload(&mut *io.stdout, &frame.payload)?;
            Ok(Some(true))
        }
        Ok(MessageTag::Error) => {
            write_payload(&mut *io.stderr, &frame.payload)?;
            Ok(Some(false))
        }
        _ => Ok(None),
    }
}

fn write_payload(sink: &mut dyn Write, payload: &str) -> Result<(), AppError> {
    sink.write_all(payload.as_bytes())
        .and_then(|()| {
            if payload.is_empty() || payload.ends_with('\n') {
                Ok(())
            } else {
                sink.write_all(b"\n")
            }
        })
        .and_then(|()| sink.flush())
        .map_err(AppError::WriteOutput)
}
