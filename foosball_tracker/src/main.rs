use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use foosball_vision::persistence::save_csv;
use foosball_vision::{
    CalibrationRecord, CandidatePolicy, FrameBus, FrameSource, ImageSequenceSource, StopReason,
    TrackerConfig, Trajectory, TrackingSession,
};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod overlay_writer;
#[cfg(feature = "video")]
mod video;

use overlay_writer::OverlayWriter;

/// Frames between two progress lines.
const PROGRESS_INTERVAL: u64 = 100;
const BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Record every candidate of every frame.
    All,
    /// Record only the largest candidate of each frame.
    LargestArea,
}

impl From<PolicyArg> for CandidatePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::All => CandidatePolicy::All,
            PolicyArg::LargestArea => CandidatePolicy::LargestArea,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "foosball_tracker", about = "Track the ball through table-soccer footage")]
#[command(version)]
struct Args {
    /// Directory of frame images, or a video file when built with `--features video`.
    #[arg(long, short, value_name = "PATH")]
    input: PathBuf,

    /// Where to write the `x,y` trajectory.
    #[arg(long, short, value_name = "CSV", default_value = "trajectory.csv")]
    output: PathBuf,

    /// TOML configuration file. Flags below override its values.
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    #[arg(long)]
    min_area: Option<f64>,

    /// Accept blobs whose area equals the minimum.
    #[arg(long)]
    inclusive: bool,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Pause after each frame, in milliseconds.
    #[arg(long)]
    delay_ms: Option<u64>,

    #[arg(long)]
    max_frames: Option<u64>,

    /// Write an annotated PNG per frame into this directory.
    #[arg(long, value_name = "DIR")]
    overlay_dir: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    #[arg(long, short)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn effective_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    if let Some(min_area) = args.min_area {
        config.filter.min_area = min_area;
    }
    if args.inclusive {
        config.filter.inclusive = true;
    }
    if let Some(policy) = args.policy {
        config.filter.policy = policy.into();
    }
    if let Some(delay_ms) = args.delay_ms {
        config.run.frame_delay_ms = delay_ms;
    }
    if let Some(max_frames) = args.max_frames {
        config.run.max_frames = max_frames;
    }
    if args.overlay_dir.is_some() {
        config.run.annotate = true;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open_source(input: &Path) -> Result<Box<dyn FrameSource + Send>> {
    if input.is_dir() {
        let source = ImageSequenceSource::open(input)
            .with_context(|| format!("opening frame directory {}", input.display()))?;
        return Ok(Box::new(source));
    }
    open_video(input)
}

#[cfg(feature = "video")]
fn open_video(input: &Path) -> Result<Box<dyn FrameSource + Send>> {
    let path = input
        .to_str()
        .with_context(|| format!("video path {} is not valid UTF-8", input.display()))?;
    let source = video::VideoSource::open(path)
        .with_context(|| format!("opening video {}", input.display()))?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "video"))]
fn open_video(input: &Path) -> Result<Box<dyn FrameSource + Send>> {
    bail!(
        "{} is not a directory; video input requires building with `--features video`",
        input.display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    init_logging(args.verbose);
    let config = effective_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    // --- 2. Input & Sinks ---
    let source = open_source(&args.input)?;
    let mut session = TrackingSession::new(&config)?;

    let bus = FrameBus::new(BUS_CAPACITY);
    session.add_sink(bus.clone());
    if let Some(dir) = &args.overlay_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating overlay directory {}", dir.display()))?;
        session.add_sink(OverlayWriter::new(dir));
    }

    // --- 3. Cancellation: Ctrl-C flips the watch channel ---
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current frame");
            let _ = stop_tx.send(true);
        }
    });

    // --- 4. Progress reporting off the bus ---
    let mut reports = bus.subscribe();
    let progress = tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) if report.frame_index % PROGRESS_INTERVAL == 0 => {
                    info!(
                        frame = report.frame_index,
                        candidates = report.candidates.len(),
                        foreground = report.foreground_pixels,
                        "progress"
                    );
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress reporter lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    drop(bus);

    // --- 5. The frame loop runs on a blocking thread ---
    let (summary, trajectory) = tokio::task::spawn_blocking(move || {
        let mut trajectory = Trajectory::new();
        let summary = session.run(source, &stop_rx, &mut trajectory);
        (summary, trajectory)
    })
    .await
    .context("tracking task failed")?;
    let _ = progress.await;

    // --- 6. Persist ---
    save_csv(&args.output, &trajectory.positions())
        .with_context(|| format!("writing trajectory to {}", args.output.display()))?;
    match summary.geometry {
        Some(geometry) => {
            let sidecar = CalibrationRecord::sidecar_path(&args.output);
            CalibrationRecord::new(geometry.frame_width, geometry.frame_height, geometry.region)
                .save(&sidecar)
                .with_context(|| format!("writing calibration to {}", sidecar.display()))?;
        }
        None => warn!("no frames were processed, calibration record skipped"),
    }

    info!(
        reason = %summary.reason,
        frames = summary.frames_processed,
        entries = trajectory.len(),
        output = %args.output.display(),
        "done"
    );

    if let StopReason::InvalidRegion(message) = summary.reason {
        bail!("tracking aborted: {message}");
    }
    Ok(())
}
