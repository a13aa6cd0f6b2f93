//! Reverse channels from the host to registered clients.
//!
//! A client binds a Unix socket at [`RuntimePaths::session_socket`] before it
//! registers; the host connects to it and writes one JSONL [`OutboundFrame`]
//! per message.

use std::rc::Rc;

use conduit_config::RuntimePaths;

use crate::channel::{Channel, ChannelError, Transport};

/// Opens reverse channels under the host's sessions directory.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    paths: RuntimePaths,
}

impl SocketTransport {
    /// Creates a transport addressing sockets under `paths`.
    #[must_use]
    pub fn new(paths: RuntimePaths) -> Self {
        Self { paths }
    }
}

#[cfg(unix)]
impl Transport for SocketTransport {
    fn open_point_to_point(&self, id: &str) -> Result<Rc<dyn Channel>, ChannelError> {
        let path = self
            .paths
            .session_socket(id)
            .map_err(|source| ChannelError::Address { source })?;
        let channel = unix::SocketChannel::connect(id, &path)?;
        Ok(Rc::new(channel))
    }
}

#[cfg(not(unix))]
impl Transport for SocketTransport {
    fn open_point_to_point(&self, _id: &str) -> Result<Rc<dyn Channel>, ChannelError> {
        let _ = &self.paths;
        Err(ChannelError::Unsupported)
    }
}

#[cfg(unix)]
mod unix {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::mem::MaybeUninit;
    use std::net::Shutdown;
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use camino::Utf8Path;
    use conduit_protocol::{MessageTag, OutboundFrame, encode_line};
    use socket2::SockRef;
    use tracing::debug;

    use super::super::LISTENER_TARGET;
    use crate::channel::{Channel, ChannelError};

    /// Bound on how long one write to a stalled client may block the host.
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    /// A connected reverse channel.
    pub(super) struct SocketChannel {
        id: String,
        stream: RefCell<Option<UnixStream>>,
    }

    impl SocketChannel {
        pub(super) fn connect(id: &str, path: &Utf8Path) -> Result<Self, ChannelError> {
            let connect_error = |source| ChannelError::Connect {
                id: id.to_owned(),
                source,
            };
            let stream = UnixStream::connect(path).map_err(connect_error)?;
            stream
                .set_write_timeout(Some(WRITE_TIMEOUT))
                .map_err(connect_error)?;
            debug!(target: LISTENER_TARGET, session = id, path = %path, "reverse channel connected");
            Ok(Self {
                id: id.to_owned(),
                stream: RefCell::new(Some(stream)),
            })
        }

        fn disconnect(&self) {
            if let Some(stream) = self.stream.borrow_mut().take() {
                // The peer may already be gone.
                let _ = stream.shutdown(Shutdown::Both);
                debug!(target: LISTENER_TARGET, session = %self.id, "reverse channel closed");
            }
        }
    }

    impl Channel for SocketChannel {
        fn send(&self, payload: &str, tag: MessageTag) -> Result<(), ChannelError> {
            let line = encode_line(&OutboundFrame {
                tag: tag.code(),
                payload: payload.to_owned(),
            })?;
            let result = {
                let mut stream = self.stream.borrow_mut();
                let stream = stream.as_mut().ok_or(ChannelError::Closed)?;
                stream.write_all(&line).and_then(|()| stream.flush())
            };
            result.map_err(|source| {
                self.disconnect();
                ChannelError::Send { source }
            })
        }

        fn is_valid(&self) -> bool {
            let stream = self.stream.borrow();
            let Some(stream) = stream.as_ref() else {
                return false;
            };
            let mut probe = [MaybeUninit::<u8>::uninit(); 1];
            match SockRef::from(stream).recv_with_flags(&mut probe, libc::MSG_PEEK | libc::MSG_DONTWAIT)
            {
                Ok(0) => false,
                Ok(_) => true,
                Err(error) => error.kind() == io::ErrorKind::WouldBlock,
            }
        }

        fn delete(&self) {
            self.disconnect();
        }
    }

}
