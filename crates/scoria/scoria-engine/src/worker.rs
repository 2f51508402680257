use basalt_bytes::{AllocError, ByteVec};
use scoria_core::SharedLog;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Receive granularity on the client socket.
const CHUNK_SIZE: usize = 200;

/// Back-off between retries of a would-block socket operation.
const RETRY_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
enum WorkerError {
    #[error("allocation failed")]
    Alloc(#[from] AllocError),
    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        source: io::Error,
    },
}

fn io_err(op: &'static str) -> impl FnOnce(io::Error) -> WorkerError {
    move |source| WorkerError::Io { op, source }
}

/// Per-client connection loop.
///
/// Each iteration receives until the buffered stream holds a newline, appends
/// every complete line to the shared log (mutex held per line), carries any
/// trailing partial line over, then replays the whole log back to the client.
/// The worker exits when the peer closes, on a non-transient error, or when
/// the shutdown flag is observed at an iteration boundary. An in-progress
/// send or append is always finished first.
pub(crate) struct ConnectionWorker {
    stream: TcpStream,
    peer: SocketAddr,
    log: Arc<SharedLog>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionWorker {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        log: Arc<SharedLog>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            stream,
            peer,
            log,
            shutdown,
        }
    }

    pub(crate) fn run(mut self) {
        match self.serve() {
            Ok(()) => debug!(peer = %self.peer, "connection finished"),
            Err(e) => error!(peer = %self.peer, "connection worker failed: {e}"),
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn serve(&mut self) -> Result<(), WorkerError> {
        self.stream.set_nonblocking(true).map_err(io_err("fcntl"))?;

        let mut recv_vec = ByteVec::new()?;
        let mut chunk = [0u8; CHUNK_SIZE];

        while !self.shutting_down() {
            // Receive until the buffer holds a complete line.
            let mut searched = 0;
            loop {
                if recv_vec.find(searched, b'\n').is_some() {
                    break;
                }
                searched = recv_vec.len();
                match self.stream.read(&mut chunk) {
                    Ok(0) => return Ok(()), // peer closed
                    Ok(n) => recv_vec.append(&chunk[..n])?,
                    Err(e)
                        if e.kind() == ErrorKind::WouldBlock
                            || e.kind() == ErrorKind::Interrupted =>
                    {
                        if self.shutting_down() {
                            return Ok(());
                        }
                        thread::sleep(RETRY_DELAY);
                    }
                    Err(e) => return Err(WorkerError::Io { op: "recv", source: e }),
                }
            }

            // Append each complete line, oldest first; the log mutex is held
            // for the full length of every line.
            let mut cursor = 0;
            while let Some(nl) = recv_vec.find(cursor, b'\n') {
                self.log
                    .append(&recv_vec[cursor..=nl])
                    .map_err(io_err("append"))?;
                cursor = nl + 1;
            }

            // A trailing partial line survives into the next receive cycle.
            if cursor < recv_vec.len() {
                recv_vec.carryover(cursor);
            } else {
                recv_vec.clear();
            }

            self.replay()?;
        }

        Ok(())
    }

    /// Sends the whole log back, one complete line per `send`. The log lock
    /// is held across the entire replay, so no concurrent writer can
    /// interleave bytes into the stream the client sees.
    fn replay(&mut self) -> Result<(), WorkerError> {
        let stream = &mut self.stream;

        // A failed send aborts the replay through the same return path as a
        // failed file read; keep the socket error aside so each gets its own
        // operation tag.
        let mut send_failure: Option<io::Error> = None;
        let result = self.log.replay(|line| {
            send_all(stream, line).map_err(|e| {
                send_failure = Some(e);
                io::ErrorKind::Other.into()
            })
        });

        if let Some(source) = send_failure {
            return Err(WorkerError::Io { op: "send", source });
        }
        result.map_err(io_err("replay"))
    }
}

/// Writes all of `buf`, retrying transient would-block conditions. The send
/// in progress is never abandoned, even during shutdown.
fn send_all(stream: &mut TcpStream, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                thread::sleep(RETRY_DELAY);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
