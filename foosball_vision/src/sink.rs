// THEORY:
// The `sink` module is the per-frame output boundary. After each frame the loop
// builds one `FrameReport` and hands it to every registered `FrameSink`. Sinks
// observe; nothing they do can change detection.
//
// `FrameBus` is the live sink: it fans reports out over a tokio broadcast channel
// to any number of subscribers (a progress printer, an overlay writer, a remote
// viewer). Publishing never blocks the loop. A subscriber that falls behind skips
// the reports it missed and picks up from the newest ones.

use crate::core_modules::candidate::Candidate;
use crate::core_modules::region::Region;
use image::RgbImage;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Rendered pictures of one frame, present only when annotation is enabled.
#[derive(Debug, Clone)]
pub struct FrameImages {
    /// The region of interest as captured.
    pub roi: Arc<RgbImage>,
    /// The masked region with fitted circles and centers drawn in.
    pub annotated: Arc<RgbImage>,
}

/// Everything observable about one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_index: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub region: Region,
    pub foreground_pixels: usize,
    pub blob_count: usize,
    /// Candidates after the policy, i.e. exactly what went into the trajectory.
    pub candidates: Vec<Candidate>,
    pub images: Option<FrameImages>,
}

/// Receives one report per processed frame.
pub trait FrameSink {
    fn on_frame(&mut self, report: &FrameReport);
}

impl<F> FrameSink for F
where
    F: FnMut(&FrameReport),
{
    fn on_frame(&mut self, report: &FrameReport) {
        self(report)
    }
}

/// Broadcasts frame reports to live subscribers.
#[derive(Clone)]
pub struct FrameBus {
    pub reports_tx: broadcast::Sender<FrameReport>,
}

impl FrameBus {
    pub fn new(capacity: usize) -> Self {
        let (reports_tx, _) = broadcast::channel::<FrameReport>(capacity.max(1));
        Self { reports_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FrameReport> {
        self.reports_tx.subscribe()
    }

    /// Sends `report` to current subscribers. Returns how many received it.
    pub fn publish(&self, report: FrameReport) -> usize {
        // No subscribers is not an error for an observer.
        self.reports_tx.send(report).unwrap_or(0)
    }
}

impl FrameSink for FrameBus {
    fn on_frame(&mut self, report: &FrameReport) {
        self.publish(report.clone());
    }
}
