// THEORY:
// This file is the main entry point for the `foosball_vision` library crate.
// It defines the public API exposed to consumers such as the `foosball_tracker`
// runner.
//
// The primary goal is to export the `TrackingSession` (the frame loop), the
// `TrackingPipeline` (the per-frame analysis), and the boundary traits
// `FrameSource` and `FrameSink` as the high-level interface of the tracker. The
// individual detection stages live in `core_modules` and stay reachable for
// callers that want to run a single stage on its own.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod persistence;
pub mod pipeline;
pub mod session;
pub mod sink;
pub mod source;

pub use config::{RunConfig, TrackerConfig};
pub use core_modules::candidate::{AreaMetric, Candidate, CandidatePolicy, FilterConfig, Position};
pub use core_modules::frame::Frame;
pub use core_modules::mask::ColorRange;
pub use core_modules::pixel::pixel::{Bgr, Hsv};
pub use core_modules::region::{Edge, Region, RegionSpec};
pub use core_modules::trajectory::{Trajectory, TrajectoryPoint, TrajectoryReader};
pub use error::{Result, VisionError};
pub use persistence::CalibrationRecord;
pub use pipeline::{FrameDetection, TrackingPipeline};
pub use session::{
    CaptureGeometry, LoopState, NeverStop, RunSummary, StopReason, StopSignal, TrackingSession,
};
pub use sink::{FrameBus, FrameImages, FrameReport, FrameSink};
pub use source::{FrameSource, ImageSequenceSource, MemorySource, SourceGuard};
