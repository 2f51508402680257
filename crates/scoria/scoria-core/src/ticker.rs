use crate::SharedLog;
use chrono::Local;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the wait loop rechecks the shutdown flag.
const POLL_STEP: Duration = Duration::from_millis(100);

/// Timestamp line layout after the `timestamp:` prefix, local time.
const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %T %z";

/// Periodic producer appending `timestamp:<date>\n` lines to the shared log.
///
/// The ticker only produces; it never replays. An append failure is logged
/// and the tick is simply lost. The interval wait is sliced so a shutdown
/// request takes effect within [`POLL_STEP`], and ticks that would fall
/// during shutdown are not produced.
pub struct TimestampTicker {
    interval: Duration,
    log: Arc<SharedLog>,
    shutdown: Arc<AtomicBool>,
}

impl TimestampTicker {
    /// Starts the ticker thread; it runs until `shutdown` is set.
    pub fn spawn(
        interval: Duration,
        log: Arc<SharedLog>,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<JoinHandle<()>> {
        let ticker = Self {
            interval,
            log,
            shutdown,
        };
        thread::Builder::new()
            .name("timestamp-ticker".into())
            .spawn(move || ticker.run())
    }

    fn run(self) {
        loop {
            let mut waited = Duration::ZERO;
            while waited < self.interval {
                if self.shutdown.load(Ordering::Relaxed) {
                    return;
                }
                let step = POLL_STEP.min(self.interval - waited);
                thread::sleep(step);
                waited += step;
            }
            if self.shutdown.load(Ordering::Relaxed) {
                return;
            }

            let line = timestamp_line();
            if let Err(e) = self.log.append(line.as_bytes()) {
                tracing::error!("timestamp append failed: {e}");
            }
        }
    }
}

fn timestamp_line() -> String {
    format!("timestamp:{}\n", Local::now().format(TIMESTAMP_FORMAT))
}
