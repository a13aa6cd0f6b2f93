//! Per-connection request handling.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc;

use conduit_protocol::{InboundFrame, ReplyFrame, decode_line, encode_line};
use tracing::{debug, warn};

use super::LISTENER_TARGET;
use crate::host_loop::Envelope;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Longest request line accepted from a client.
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Stream types accepted by the host listener.
pub(crate) enum ConnectionStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

/// Reads one request, hands it to the control loop and writes back its reply.
#[derive(Debug)]
pub(crate) struct ForwardingHandler {
    inbox: mpsc::Sender<Envelope>,
}

impl ForwardingHandler {
    pub(crate) fn new(inbox: mpsc::Sender<Envelope>) -> Self {
        Self { inbox }
    }

    fn forward(&self, frame: InboundFrame) -> ReplyFrame {
        let (reply, answer) = mpsc::channel();
        let envelope = Envelope {
            tag: frame.tag,
            payload: frame.payload,
            reply,
        };
        if self.inbox.send(envelope).is_err() {
            return ReplyFrame::Error("host is shutting down".to_owned());
        }
        answer
            .recv()
            .unwrap_or_else(|_| ReplyFrame::Error("host dropped the request".to_owned()))
    }
}

impl ConnectionHandler for ForwardingHandler {
    fn handle(&self, stream: ConnectionStream) {
        let mut reader = BufReader::new(stream);
        let line = match read_request_line(&mut reader) {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(target: LISTENER_TARGET, "connection closed without a request");
                return;
            }
            Err(error) => {
                warn!(target: LISTENER_TARGET, error = %error, "failed to read request");
                return;
            }
        };

        let reply = match decode_line::<InboundFrame>(&line) {
            Ok(frame) => self.forward(frame),
            Err(error) => {
                warn!(target: LISTENER_TARGET, error = %error, "rejecting malformed request");
                ReplyFrame::Error(error.to_string())
            }
        };

        if let Err(error) = write_reply(reader.get_mut(), &reply) {
            warn!(target: LISTENER_TARGET, error = %error, "failed to write reply");
        }
    }
}

fn write_reply(stream: &mut ConnectionStream, reply: &ReplyFrame) -> io::Result<()> {
    let line = encode_line(reply).map_err(io::Error::other)?;
    stream.write_all(&line)?;
    stream.flush()
}

/// Reads one newline-terminated line, or whatever precedes end of stream.
///
/// Returns `None` when the peer closes before sending anything.
pub(crate) fn read_request_line(reader: &mut impl BufRead) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let limit = u64::try_from(MAX_REQUEST_BYTES + 1).unwrap_or(u64::MAX);
    let read = reader.take(limit).read_until(b'\n', &mut buffer)?;
    if read == 0 {
        return Ok(None);
    }
    if buffer.len() > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(Some(buffer))
}
