//! Non-blocking background jobs with progress polling.

use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::thread::JoinHandle;

/// The kinds of job the engine runs. At most one runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Download,
    AutoSync,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Download => f.write_str("download"),
            JobKind::AutoSync => f.write_str("auto-sync"),
        }
    }
}

pub enum JobStatus<T> {
    /// Progress 0.0..1.0.
    Running(f32),
    Complete(T),
    Failed(String),
    Pending,
}

/// Worker-side end of the progress channel.
#[derive(Clone)]
pub struct ProgressSender {
    tx: Sender<f32>,
}

impl ProgressSender {
    /// Report progress in 0.0..1.0. Drops the update if the channel is full.
    pub fn report(&self, progress: f32) {
        let _ = self.tx.try_send(progress.clamp(0.0, 1.0));
    }
}

/// Handle to a background job.
/// Poll with [`JobHandle::poll`] from the orchestrating thread.
pub struct JobHandle<T> {
    kind: JobKind,
    progress_rx: Receiver<f32>,
    thread: Option<JoinHandle<std::result::Result<T, String>>>,
    last_progress: Option<f32>,
}

impl<T: Send + 'static> JobHandle<T> {
    /// Run `work` on a dedicated thread.
    pub fn spawn<F>(kind: JobKind, work: F) -> Self
    where
        F: FnOnce(&ProgressSender) -> std::result::Result<T, String> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let progress = ProgressSender { tx };

        let thread = std::thread::Builder::new()
            .name(format!("clicktrack-{kind}"))
            .spawn(move || work(&progress))
            .expect("failed to spawn job thread");

        Self {
            kind,
            progress_rx: rx,
            thread: Some(thread),
            last_progress: None,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Latest progress reported by the worker, if any.
    pub fn last_progress(&self) -> Option<f32> {
        self.last_progress
    }

    /// Poll for progress or the result (non-blocking).
    pub fn poll(&mut self) -> JobStatus<T> {
        while let Ok(p) = self.progress_rx.try_recv() {
            self.last_progress = Some(p);
        }

        match self.thread.take() {
            Some(thread) if thread.is_finished() => {
                return match thread.join() {
                    Ok(Ok(value)) => JobStatus::Complete(value),
                    Ok(Err(e)) => JobStatus::Failed(e),
                    Err(_) => JobStatus::Failed(format!("{} thread panicked", self.kind)),
                };
            }
            Some(thread) => self.thread = Some(thread),
            None => return JobStatus::Failed(format!("{} already consumed", self.kind)),
        }

        match self.last_progress {
            Some(p) => JobStatus::Running(p),
            None => JobStatus::Pending,
        }
    }

    pub fn wait(mut self) -> std::result::Result<T, String> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .unwrap_or_else(|_| Err(format!("{} thread panicked", self.kind))),
            None => Err(format!("{} already consumed", self.kind)),
        }
    }

    pub fn is_done(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }
}
