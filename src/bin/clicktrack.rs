//! `clicktrack` - play a track with a beat-synchronized metronome.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clicktrack::prelude::*;
use clicktrack::AnalysisHandle;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Clicktrack - practise along with a metronome locked to the music
#[derive(Parser, Debug)]
#[command(name = "clicktrack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Play audio with a beat-synchronized metronome click", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a file until it ends
    Play {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Print the detected tempo and first beat of a file
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Download the audio behind a URL with yt-dlp
    Download {
        url: String,

        /// Where to save the MP3
        #[arg(value_name = "OUT")]
        out: PathBuf,

        /// Play the file once downloaded
        #[arg(long)]
        play: bool,

        #[command(flatten)]
        playback: PlaybackArgs,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct PlaybackArgs {
    /// Metronome tempo
    #[arg(long)]
    bpm: Option<f64>,

    /// Position of the first beat in milliseconds
    #[arg(long = "offset-ms", default_value_t = 0.0)]
    offset_ms: f64,

    /// Detect tempo and first beat before playing
    #[arg(long)]
    auto_sync: bool,

    /// Playback rate (0.5 - 2.0, step 0.1)
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Loop region in seconds, e.g. 12.5:20
    #[arg(long = "loop", value_name = "START:END", value_parser = parse_loop)]
    loop_region: Option<(f64, f64)>,

    /// Run without an audio device
    #[arg(long)]
    headless: bool,
}

fn parse_loop(value: &str) -> std::result::Result<(f64, f64), String> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{value}'"))?;
    let start: f64 = start
        .trim()
        .parse()
        .map_err(|e| format!("bad loop start '{start}': {e}"))?;
    let end: f64 = end
        .trim()
        .parse()
        .map_err(|e| format!("bad loop end '{end}': {e}"))?;
    Ok((start, end))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Play { file, playback } => {
            let engine = build_engine(&playback)?;
            engine
                .load_file(&file)
                .with_context(|| format!("loading {}", file.display()))?;
            run_playback(&engine, &playback)
        }
        Commands::Analyze { file } => analyze(&file),
        Commands::Download {
            url,
            out,
            play,
            playback,
        } => {
            let engine = build_engine(&playback)?;
            engine.start_download(&url, &out)?;
            match wait_for(&engine)? {
                JobOutcome::Downloaded(path) => info!("Saved {}", path.display()),
                JobOutcome::Failed { message, .. } => bail!("download failed: {message}"),
                JobOutcome::Synced(_) => {}
            }
            if play {
                run_playback(&engine, &playback)?;
            }
            Ok(())
        }
    }
}

fn build_engine(playback: &PlaybackArgs) -> Result<ClickTrackEngine> {
    let builder = ClickTrackEngine::builder();
    let builder = if playback.headless {
        builder.headless()
    } else {
        builder
    };
    Ok(builder.build()?)
}

fn run_playback(engine: &ClickTrackEngine, playback: &PlaybackArgs) -> Result<()> {
    let rate = engine.set_rate(playback.rate)?;
    if (rate - playback.rate).abs() > 1e-9 {
        info!("Playback rate adjusted to {:.1}x", rate);
    }

    if playback.auto_sync {
        engine.start_auto_sync()?;
        if let JobOutcome::Failed { message, .. } = wait_for(engine)? {
            bail!("auto-sync failed: {message}");
        }
    } else if let Some(bpm) = playback.bpm {
        engine.set_bpm(bpm)?;
        engine.set_beat_offset_ms(playback.offset_ms)?;
        engine.set_metronome_enabled(bpm > 0.0);
    }

    engine.play()?;

    if let Some((start, end)) = playback.loop_region {
        engine.set_loop(start, end)?;
    }

    // Runs until end of media; a loop keeps it going until interrupted
    let mut last_second = None;
    while engine.is_playing() {
        let snapshot = engine.snapshot();
        let second = snapshot.position_ms / 1000;
        if last_second != Some(second) {
            last_second = Some(second);
            println!(
                "{:>4}s / {}s  {:.1} BPM{}",
                second,
                snapshot.duration_ms / 1000,
                snapshot.bpm,
                if snapshot.metronome_enabled { "" } else { " (muted)" }
            );
        }
        thread::sleep(Duration::from_millis(100));
    }
    println!("{}", engine.status());
    Ok(())
}

fn analyze(file: &Path) -> Result<()> {
    let handle = AnalysisHandle::new();
    let audio = handle
        .decode(file)
        .with_context(|| format!("decoding {}", file.display()))?;
    let detection = handle.detect_beats(&audio);

    println!("File:       {}", file.display());
    println!("Duration:   {:.2}s", audio.duration_secs());
    match detection.beat_times_sec.first() {
        Some(first) if detection.tempo_bpm > 0.0 => {
            println!("Tempo:      {:.1} BPM", detection.tempo_bpm);
            println!("First beat: {:.3}s", first);
            println!("Beats:      {}", detection.beat_times_sec.len());
        }
        _ => println!("No beats detected"),
    }
    Ok(())
}

fn wait_for(engine: &ClickTrackEngine) -> Result<JobOutcome> {
    let mut last_progress = None;
    loop {
        if let Some(outcome) = engine.poll_jobs() {
            return Ok(outcome);
        }
        if !engine.is_busy() {
            bail!("no job running");
        }
        let progress = engine.snapshot().job_progress.map(|p| (p * 100.0) as u32);
        if progress.is_some() && progress != last_progress {
            last_progress = progress;
            println!("{}", engine.status());
        }
        thread::sleep(Duration::from_millis(100));
    }
}
