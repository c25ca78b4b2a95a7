//! Fetching audio from a URL into a local file.

use crate::{Error, Result};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Fetches the audio behind `url` into `dest`.
///
/// Runs on a job thread; `progress` receives 0.0..1.0.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path, progress: &mut dyn FnMut(f32)) -> Result<()>;
}

/// Downloads through the external `yt-dlp` program.
///
/// Picks the best audio stream, extracts it to MP3 into a scratch directory
/// and copies the result to the destination.
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    program: PathBuf,
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
        }
    }

    /// Use a specific `yt-dlp` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for YtDlpDownloader {
    fn download(&self, url: &str, dest: &Path, progress: &mut dyn FnMut(f32)) -> Result<()> {
        let scratch = tempfile::tempdir()?;
        let template = scratch.path().join("download.%(ext)s");

        info!("Downloading {} via {}", url, self.program.display());
        let mut child = Command::new(&self.program)
            .args(["--format", "bestaudio/best"])
            .args(["--extract-audio", "--audio-format", "mp3"])
            .args(["--no-playlist", "--newline", "--force-overwrites"])
            .arg("--output")
            .arg(&template)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Download(format!("cannot run {}: {e}", self.program.display()))
            })?;

        // stderr drains concurrently so a chatty child cannot block on a full pipe
        let stderr = match child.stderr.take().map(drain_stderr).transpose() {
            Ok(stderr) => stderr,
            Err(e) => {
                reap(&mut child);
                return Err(e.into());
            }
        };

        let forwarded = match child.stdout.take() {
            Some(stdout) => forward_progress(stdout, progress),
            None => Ok(()),
        };
        if forwarded.is_err() {
            if let Err(e) = child.kill() {
                warn!("Failed to kill yt-dlp: {}", e);
            }
        }
        let status = child.wait();

        let last_error = match stderr {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Download("yt-dlp stderr reader panicked".into()))??,
            None => String::new(),
        };
        forwarded?;
        let status = status?;
        if !status.success() {
            let detail = if last_error.is_empty() {
                "no output"
            } else {
                last_error.as_str()
            };
            return Err(Error::Download(format!("yt-dlp exited with {status}: {detail}")));
        }

        let produced = find_output(scratch.path())?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&produced, dest)?;
        progress(1.0);

        info!("Saved {}", dest.display());
        Ok(())
    }
}

/// Report `[download]` lines as progress until stdout closes.
fn forward_progress(stdout: ChildStdout, progress: &mut dyn FnMut(f32)) -> io::Result<()> {
    for line in BufReader::new(stdout).lines() {
        let line = line?;
        if let Some(p) = parse_progress_line(&line) {
            progress(p);
        } else {
            debug!("yt-dlp: {}", line);
        }
    }
    Ok(())
}

/// Read stderr to EOF on a helper thread, keeping the last non-empty line.
fn drain_stderr(pipe: ChildStderr) -> io::Result<JoinHandle<io::Result<String>>> {
    thread::Builder::new()
        .name("clicktrack-ytdlp-stderr".into())
        .spawn(move || {
            let mut last = String::new();
            for line in BufReader::new(pipe).lines() {
                let line = line?;
                let line = line.trim();
                if !line.is_empty() {
                    last = line.to_string();
                }
            }
            Ok(last)
        })
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill yt-dlp: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap yt-dlp: {}", e);
    }
}

/// Progress fraction from a yt-dlp line such as `[download]  42.0% of 3.1MiB`.
pub fn parse_progress_line(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix("[download]")?;
    let percent = rest.split_whitespace().next()?.strip_suffix('%')?;
    let value: f32 = percent.parse().ok()?;
    value.is_finite().then(|| (value / 100.0).clamp(0.0, 1.0))
}

/// The file yt-dlp left in `dir`, preferring the extracted MP3.
fn find_output(dir: &Path) -> Result<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    files
        .iter()
        .find(|p| p.extension().is_some_and(|ext| ext == "mp3"))
        .or_else(|| files.first())
        .cloned()
        .ok_or_else(|| Error::Download("yt-dlp produced no file".into()))
}
