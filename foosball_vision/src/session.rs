// THEORY:
// The `session` module is the orchestration loop: the two-state machine that
// pulls frames from a source, pushes them through the `TrackingPipeline`, and
// appends the accepted candidates to the caller's `Trajectory`.
//
// Key architectural principles & loop steps:
// 1.  **Two States**: The loop is `Running` until something stops it, then
//     `Stopped` for good. There are no retries and no restarts; a new run needs
//     a new call.
// 2.  **One Frame At A Time**: Each iteration reads one frame, analyses it,
//     records its candidates, notifies the sinks, optionally sleeps for pacing,
//     and only then checks the external stop signal. Cancellation is cooperative
//     and is observed between frames, never in the middle of one.
// 3.  **Every Exit Releases**: End of stream, read error, cancellation, invalid
//     region, frame limit, or a panic unwinding out of an iteration; in all cases
//     the `SourceGuard` releases the source exactly once.
// 4.  **Caller Owns The Result**: The trajectory is borrowed, not owned, so it
//     outlives both the loop and the source.

use crate::config::{RunConfig, TrackerConfig};
use crate::core_modules::region::Region;
use crate::core_modules::trajectory::Trajectory;
use crate::error::{Result, VisionError};
use crate::pipeline::TrackingPipeline;
use crate::sink::{FrameReport, FrameSink};
use crate::source::{FrameSource, SourceGuard};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// The two states of the orchestration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The source has no more frames.
    EndOfStream,
    /// The source failed to produce a frame.
    ReadError(String),
    /// The stop signal was raised.
    Cancelled,
    /// A frame was too small to hold a non-empty region of interest.
    InvalidRegion(String),
    /// The configured frame limit was reached.
    FrameLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => write!(f, "end of stream"),
            StopReason::ReadError(message) => write!(f, "read error: {message}"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::InvalidRegion(message) => write!(f, "invalid region: {message}"),
            StopReason::FrameLimit => write!(f, "frame limit reached"),
        }
    }
}

/// An external request to stop, polled once per completed frame.
pub trait StopSignal {
    fn should_stop(&self) -> bool;
}

impl StopSignal for watch::Receiver<bool> {
    fn should_stop(&self) -> bool {
        *self.borrow()
    }
}

impl StopSignal for AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

impl<T: StopSignal + ?Sized> StopSignal for Arc<T> {
    fn should_stop(&self) -> bool {
        (**self).should_stop()
    }
}

/// A stop signal that is never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopSignal for NeverStop {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Frame size and region of the last processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureGeometry {
    pub frame_width: u32,
    pub frame_height: u32,
    pub region: Region,
}

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub state: LoopState,
    pub reason: StopReason,
    pub frames_processed: u64,
    pub candidates_accepted: u64,
    /// `None` if no frame was processed.
    pub geometry: Option<CaptureGeometry>,
}

/// Drives a `TrackingPipeline` over a `FrameSource`.
pub struct TrackingSession {
    pipeline: TrackingPipeline,
    run: RunConfig,
    sinks: Vec<Box<dyn FrameSink + Send>>,
    state: LoopState,
}

impl TrackingSession {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        Ok(Self {
            pipeline: TrackingPipeline::new(config)?,
            run: config.run.clone(),
            sinks: Vec::new(),
            state: LoopState::Stopped,
        })
    }

    /// Registers an observer that receives a report after every frame.
    pub fn add_sink(&mut self, sink: impl FrameSink + Send + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs the loop until the source ends, fails, or is cancelled, then
    /// releases the source. Candidates are appended to `trajectory`.
    pub fn run<S: FrameSource>(
        &mut self,
        source: S,
        stop: &dyn StopSignal,
        trajectory: &mut Trajectory,
    ) -> RunSummary {
        let mut source = SourceGuard::new(source);
        let frame_limit = self.run.frame_limit();
        let frame_delay = self.run.frame_delay();
        let mut frames_processed: u64 = 0;
        let mut candidates_accepted: u64 = 0;
        let mut geometry: Option<CaptureGeometry> = None;
        let mut size_mismatch_seen = false;

        self.state = LoopState::Running;
        info!(
            min_area = self.pipeline.filter().min_area,
            frame_limit = ?frame_limit,
            frame_delay = ?frame_delay,
            annotate = self.pipeline.annotates(),
            "tracking started"
        );

        let reason = loop {
            if frame_limit.is_some_and(|limit| frames_processed >= limit) {
                break StopReason::FrameLimit;
            }

            // --- 1. Acquire ---
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(err) => {
                    warn!(frame = frames_processed, error = %err, "frame read failed");
                    break StopReason::ReadError(err.to_string());
                }
            };
            let frame_index = frames_processed;
            let reported = (source.source().width(), source.source().height());
            let actual = (frame.width(), frame.height());
            if reported != actual && reported != (0, 0) && !size_mismatch_seen {
                size_mismatch_seen = true;
                warn!(
                    frame = frame_index,
                    reported = ?reported,
                    actual = ?actual,
                    "source size disagrees with its frames, using the frame size"
                );
            }

            // --- 2. Detect ---
            let detection = match self.pipeline.process_frame(&frame) {
                Ok(detection) => detection,
                Err(VisionError::InvalidRegion(message)) => {
                    error!(frame = frame_index, %message, "region of interest is empty");
                    break StopReason::InvalidRegion(message);
                }
                Err(err) => {
                    error!(frame = frame_index, error = %err, "frame could not be analysed");
                    break StopReason::ReadError(err.to_string());
                }
            };

            // --- 3. Accumulate ---
            let accepted = trajectory.record(frame_index, &detection.candidates);
            candidates_accepted += accepted as u64;
            frames_processed += 1;
            geometry = Some(CaptureGeometry {
                frame_width: actual.0,
                frame_height: actual.1,
                region: detection.region,
            });
            debug!(
                frame = frame_index,
                blobs = detection.blob_count,
                candidates = accepted,
                "frame processed"
            );

            // --- 4. Observe ---
            if !self.sinks.is_empty() {
                let report = FrameReport {
                    frame_index,
                    frame_width: actual.0,
                    frame_height: actual.1,
                    region: detection.region,
                    foreground_pixels: detection.mask.foreground_count(),
                    blob_count: detection.blob_count,
                    candidates: detection.candidates,
                    images: detection.images,
                };
                for sink in &mut self.sinks {
                    sink.on_frame(&report);
                }
            }

            // --- 5. Pace, then honour cancellation ---
            if let Some(delay) = frame_delay {
                std::thread::sleep(delay);
            }
            if stop.should_stop() {
                break StopReason::Cancelled;
            }
        };

        source.release();
        self.state = LoopState::Stopped;
        info!(
            reason = %reason,
            frames = frames_processed,
            candidates = candidates_accepted,
            "tracking stopped"
        );

        RunSummary {
            state: self.state,
            reason,
            frames_processed,
            candidates_accepted,
            geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::Frame;
    use crate::core_modules::pixel::pixel::Bgr;
    use crate::source::MemorySource;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    const FIELD: Bgr = Bgr {
        blue: 40,
        green: 120,
        red: 30,
    };
    const BALL: Bgr = Bgr {
        blue: 0,
        green: 180,
        red: 255,
    };

    fn ball_frame() -> Frame {
        let mut frame = Frame::filled(640, 240, FIELD);
        frame.fill_rect(338, 95, 10, 10, BALL);
        frame
    }

    fn releases_of(source: &MemorySource) -> Arc<AtomicUsize> {
        source.release_counter()
    }

    #[test]
    fn read_error_stops_and_releases() {
        let source = MemorySource::new(vec![ball_frame(), ball_frame()]).with_read_error("disk");
        let releases = releases_of(&source);
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let mut trajectory = Trajectory::new();

        let summary = session.run(source, &NeverStop, &mut trajectory);

        assert_eq!(summary.state, LoopState::Stopped);
        assert!(matches!(summary.reason, StopReason::ReadError(ref m) if m.contains("disk")));
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(trajectory.len(), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_region_is_fatal_but_keeps_earlier_entries() {
        let source = MemorySource::new(vec![
            ball_frame(),
            Frame::filled(3, 3, FIELD),
            ball_frame(),
        ]);
        let releases = releases_of(&source);
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let mut trajectory = Trajectory::new();

        let summary = session.run(source, &NeverStop, &mut trajectory);

        assert!(matches!(summary.reason, StopReason::InvalidRegion(_)));
        assert_eq!(summary.frames_processed, 1);
        assert_eq!(trajectory.len(), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn frame_limit_stops_early() {
        let mut config = TrackerConfig::default();
        config.run.max_frames = 3;
        let source = MemorySource::new((0..10).map(|_| ball_frame()));
        let releases = releases_of(&source);
        let mut session = TrackingSession::new(&config).unwrap();
        let mut trajectory = Trajectory::new();

        let summary = session.run(source, &NeverStop, &mut trajectory);

        assert_eq!(summary.reason, StopReason::FrameLimit);
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.candidates_accepted, 3);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn raised_signal_is_seen_after_the_first_frame() {
        let source = MemorySource::new((0..5).map(|_| ball_frame()));
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let mut trajectory = Trajectory::new();
        let stop = AtomicBool::new(true);

        let summary = session.run(source, &stop, &mut trajectory);

        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.frames_processed, 1);
    }

    #[test]
    fn watch_channel_is_a_stop_signal() {
        let (tx, rx) = watch::channel(false);
        assert!(!rx.should_stop());
        tx.send(true).unwrap();
        assert!(rx.should_stop());
    }

    #[test]
    fn sinks_receive_one_report_per_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        session.add_sink(move |report: &FrameReport| {
            recorder
                .lock()
                .unwrap()
                .push((report.frame_index, report.candidates.len()));
        });

        let frames = vec![Frame::filled(640, 240, FIELD), ball_frame()];
        let summary = session.run(MemorySource::new(frames), &NeverStop, &mut Trajectory::new());

        assert_eq!(summary.reason, StopReason::EndOfStream);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 0), (1, 1)]);
        let geometry = summary.geometry.unwrap();
        assert_eq!((geometry.frame_width, geometry.region.x0), (640, 243));
    }

    /// Reports a fixed size regardless of the frames it yields.
    struct MislabelledSource {
        frames: Vec<Frame>,
        size_queries: Arc<AtomicUsize>,
    }

    impl FrameSource for MislabelledSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.pop())
        }

        fn width(&self) -> u32 {
            self.size_queries.fetch_add(1, Ordering::SeqCst);
            320
        }

        fn height(&self) -> u32 {
            200
        }

        fn release(&mut self) {}
    }

    #[test]
    fn source_size_is_queried_per_frame_and_frames_win() {
        let size_queries = Arc::new(AtomicUsize::new(0));
        let source = MislabelledSource {
            frames: vec![ball_frame(), ball_frame(), ball_frame()],
            size_queries: Arc::clone(&size_queries),
        };
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let mut trajectory = Trajectory::new();

        let summary = session.run(source, &NeverStop, &mut trajectory);

        assert_eq!(summary.frames_processed, 3);
        assert_eq!(size_queries.load(Ordering::SeqCst), 3);
        let geometry = summary.geometry.unwrap();
        assert_eq!((geometry.frame_width, geometry.frame_height), (640, 240));
        assert_eq!(geometry.region.x1, 506);
        assert_eq!(trajectory.len(), 3);
    }

    #[test]
    fn empty_source_reports_no_geometry() {
        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let summary = session.run(
            MemorySource::new(Vec::new()),
            &NeverStop,
            &mut Trajectory::new(),
        );
        assert_eq!(summary.reason, StopReason::EndOfStream);
        assert_eq!(summary.frames_processed, 0);
        assert!(summary.geometry.is_none());
        assert_eq!(session.state(), LoopState::Stopped);
    }
}
