//! Dedicated thread that invokes a tick closure at a fixed interval.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Periodic tick thread.
///
/// The closure returns [`ControlFlow::Break`] to end the loop from inside
/// (end of media). [`SchedulerThread::stop`] ends it from outside; it is
/// idempotent and joins the thread.
pub struct SchedulerThread {
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SchedulerThread {
    pub fn spawn<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let thread_finished = Arc::clone(&finished);

        let handle = thread::Builder::new()
            .name("clicktrack-scheduler".into())
            .spawn(move || {
                let mut next_tick = Instant::now() + interval;
                while !thread_shutdown.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now < next_tick {
                        thread::sleep(next_tick - now);
                        continue;
                    }
                    // Fixed-rate without catch-up bursts after a stall
                    next_tick = (next_tick + interval).max(now);

                    if tick().is_break() {
                        debug!("Scheduler loop finished");
                        break;
                    }
                }
                thread_finished.store(true, Ordering::Release);
            })
            .expect("Failed to spawn scheduler thread");

        Self {
            shutdown,
            finished,
            thread_handle: Some(handle),
        }
    }

    /// Whether the loop is still ticking.
    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some() && !self.finished.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Stopped from inside a tick; the loop exits on its own
                return;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for SchedulerThread {
    fn drop(&mut self) {
        self.stop();
    }
}
