// THEORY:
// The `pipeline` module is the per-frame analysis API of the tracker. It chains
// the detection stages into one call: given a frame, it returns the candidate
// ball positions found in it, plus enough intermediate data for observers.
//
// It is deliberately stateless across frames. Feeding the same frame twice gives
// the same answer twice; the trajectory, the only cross-frame state, lives in the
// session that drives the pipeline.

use crate::config::TrackerConfig;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::candidate::FilterConfig;
use crate::core_modules::frame::Frame;
use crate::core_modules::mask::ColorSegmenter;
use crate::core_modules::overlay;
use crate::core_modules::region::{Region, RegionSpec};
use crate::error::Result;
use crate::sink::FrameImages;
use std::sync::Arc;

// Re-export key data structures for the public API.
pub use crate::core_modules::candidate::{Candidate, Position};
pub use crate::core_modules::mask::Mask;

/// The outcome of analysing a single frame.
#[derive(Debug, Clone)]
pub struct FrameDetection {
    pub region: Region,
    pub mask: Mask,
    pub blob_count: usize,
    /// Candidates after the configured policy, in extraction order.
    pub candidates: Vec<Candidate>,
    pub images: Option<FrameImages>,
}

/// Region, Segment, Extract, Filter & Fit, bundled.
#[derive(Debug, Clone)]
pub struct TrackingPipeline {
    region: RegionSpec,
    segmenter: ColorSegmenter,
    filter: FilterConfig,
    annotate: bool,
}

impl TrackingPipeline {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            region: config.region.clone(),
            segmenter: ColorSegmenter::new(config.color)?,
            filter: config.filter.clone(),
            annotate: config.run.annotate,
        })
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn annotates(&self) -> bool {
        self.annotate
    }

    pub fn process_frame(&self, frame: &Frame) -> Result<FrameDetection> {
        // Stage 1: Region Selection
        let roi = self.region.view(frame)?;

        // Stage 2: Color Segmentation
        let mask = self.segmenter.segment(&roi);

        // Stage 3: Blob Extraction
        let blobs = blob_detector::find_blobs(&mask);

        // Stage 4: Filter & Fit, then the optional reduction
        let candidates = self.filter.select(&blobs);

        // Stage 5: Rendering, only for observers that asked for it
        let images = self.annotate.then(|| FrameImages {
            roi: Arc::new(roi.to_rgb_image()),
            annotated: Arc::new(overlay::annotate(&roi, &mask, &candidates)),
        });

        Ok(FrameDetection {
            region: roi.region(),
            mask,
            blob_count: blobs.len(),
            candidates,
            images,
        })
    }
}
