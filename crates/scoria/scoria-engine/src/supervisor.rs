use crate::worker::ConnectionWorker;
use scoria_core::SharedLog;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Back-off between polls of a would-block accept.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Back-off between reap sweeps while draining.
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// One spawned connection thread, reaped once it has finished.
struct WorkerHandle {
    peer: SocketAddr,
    join: JoinHandle<()>,
}

/// Owns the listening socket and the worker list.
///
/// The supervisor accepts non-blockingly, spawns one worker thread per
/// client, and sweeps the worker list for finished threads after every accept
/// iteration. When the shutdown flag is raised it stops accepting and drains:
/// workers finish their current receive/replay cycle, get joined, and the
/// supervisor returns. The worker list is touched by this thread only.
pub struct Supervisor {
    listener: TcpListener,
    log: Arc<SharedLog>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<WorkerHandle>,
}

impl Supervisor {
    /// Wraps an already-bound listener. The listener is switched to
    /// non-blocking mode so the accept loop can poll the shutdown flag.
    pub fn new(
        listener: TcpListener,
        log: Arc<SharedLog>,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            log,
            shutdown,
            workers: Vec::new(),
        })
    }

    /// Runs the accept loop until shutdown, then drains every worker.
    ///
    /// Returns an error only for a fatal accept failure; per-connection
    /// failures are logged by the worker that hit them and never tear down
    /// the rest of the server.
    pub fn run(&mut self) -> io::Result<()> {
        info!("waiting for connections");

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("accepted connection from {peer}");
                    let worker = ConnectionWorker::new(
                        stream,
                        peer,
                        Arc::clone(&self.log),
                        Arc::clone(&self.shutdown),
                    );
                    let join = thread::Builder::new()
                        .name(format!("conn-{peer}"))
                        .spawn(move || worker.run())?;
                    self.workers.push(WorkerHandle { peer, join });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("accept failed: {e}");
                    return Err(e);
                }
            }
            self.reap_finished();
        }

        info!("caught shutdown, draining {} workers", self.workers.len());
        self.drain();
        Ok(())
    }

    /// Joins every worker whose thread has finished.
    fn reap_finished(&mut self) {
        let mut i = 0;
        while i < self.workers.len() {
            if self.workers[i].join.is_finished() {
                let handle = self.workers.swap_remove(i);
                if handle.join.join().is_err() {
                    warn!("worker for {} panicked", handle.peer);
                }
                info!("closed connection from {}", handle.peer);
            } else {
                i += 1;
            }
        }
    }

    /// Polls the worker list until every connection thread has exited.
    fn drain(&mut self) {
        while !self.workers.is_empty() {
            self.reap_finished();
            if !self.workers.is_empty() {
                thread::sleep(DRAIN_POLL);
            }
        }
    }
}
