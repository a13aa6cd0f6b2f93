//! Reverse channel on which the host delivers results and output.
//!
//! The client binds a Unix socket at the session's well-known path before it
//! registers. The host connects while handling the registration, so by the
//! time the Register reply arrives the connection is already queued. A
//! background thread then decodes JSONL [`OutboundFrame`]s and forwards them
//! to the main thread over a channel.

use std::io::{self, BufRead, BufReader, ErrorKind};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use conduit_protocol::{OutboundFrame, decode_line};

use crate::AppError;

const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Bound but not yet connected reverse channel socket.
///
/// The socket file is removed on drop.
pub(crate) struct ReverseListener {
    path: Utf8PathBuf,
    listener: UnixListener,
}

impl ReverseListener {
    /// Binds the reverse channel socket, replacing a leftover file from an
    /// earlier client with the same identifier.
    pub(crate) fn bind(path: &Utf8Path) -> Result<Self, AppError> {
        if let Err(source) = std::fs::remove_file(path.as_std_path())
            && source.kind() != ErrorKind::NotFound
        {
            return Err(AppError::BindReverse {
                path: path.to_path_buf(),
                source,
            });
        }
        let listener = UnixListener::bind(path.as_std_path())
            .and_then(|listener| listener.set_nonblocking(true).map(|()| listener))
            .map_err(|source| AppError::BindReverse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    /// Waits up to `patience` for the host's connection and starts reading
    /// frames from it.
    pub(crate) fn accept(self, patience: Duration) -> Result<ReverseChannel, AppError> {
        let deadline = Instant::now() + patience;
        loop {
            match self.listener.accept() {
                Ok((stream, _)) => return self.start_reader(stream),
                Err(error) if error.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(AppError::ReverseNotConnected {
                            path: self.path.clone(),
                        });
                    }
                    thread::sleep(ACCEPT_POLL);
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(AppError::AcceptReverse {
                        path: self.path.clone(),
                        source,
                    });
                }
            }
        }
    }

    fn start_reader(&self, stream: UnixStream) -> Result<ReverseChannel, AppError> {
        let accept_error = |source: io::Error| AppError::AcceptReverse {
            path: self.path.clone(),
            source,
        };
        stream.set_nonblocking(false).map_err(accept_error)?;
        let control = stream.try_clone().map_err(accept_error)?;
        let (sender, frames) = mpsc::channel();
        let reader = thread::spawn(move || forward_frames(stream, &sender));
        Ok(ReverseChannel {
            control,
            frames,
            reader: Some(reader),
        })
    }
}

impl Drop for ReverseListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.path.as_std_path());
    }
}

fn forward_frames(stream: UnixStream, sender: &Sender<OutboundFrame>) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {
                let Ok(frame) = decode_line::<OutboundFrame>(&line) else {
                    continue;
                };
                if sender.send(frame).is_err() {
                    return;
                }
            }
        }
    }
}

/// Connected reverse channel.
pub(crate) struct ReverseChannel {
    control: UnixStream,
    frames: Receiver<OutboundFrame>,
    reader: Option<JoinHandle<()>>,
}

impl ReverseChannel {
    /// Blocks until the next frame arrives. `None` once the host has closed
    /// the channel and every frame has been delivered.
    pub(crate) fn next_frame(&self) -> Option<OutboundFrame> {
        self.frames.recv().ok()
    }

    /// Waits for the reader to observe the host closing the channel and
    /// returns whatever frames were still in flight.
    pub(crate) fn finish(mut self) -> Vec<OutboundFrame> {
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        self.frames.try_iter().collect()
    }
}

impl Drop for ReverseChannel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            let _ = self.control.shutdown(Shutdown::Both);
            let _ = reader.join();
        }
    }
}
