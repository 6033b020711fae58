// THEORY:
// The `Candidate` module is the Filter & Fit stage, the last step of the per-frame
// analysis. It decides which blobs are big enough to be the ball and turns each
// survivor into a position estimate.
//
// Key architectural principles:
// 1.  **Area Gate**: Blobs whose area does not pass `min_area` are discarded as
//     noise specks. The comparison is strict by default (`area > min_area`) and
//     can be made inclusive. Area is measured either as a pixel count or as the
//     contour's polygon area.
// 2.  **Circle Fit**: Each surviving contour gets a minimal enclosing circle. The
//     center, rounded half away from zero, is the candidate position in ROI-local
//     pixels; the radius is the apparent ball size.
// 3.  **No Disambiguation Here**: Every qualifying blob becomes a candidate, in
//     extraction order. Picking "the" ball among several is a separate, opt-in
//     `CandidatePolicy` applied afterwards.

use crate::core_modules::blob::Blob;
use crate::core_modules::enclosing_circle::min_enclosing_circle;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};

/// How a blob's area is measured against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMetric {
    /// Number of foreground pixels in the blob.
    #[default]
    PixelCount,
    /// Shoelace area of the boundary contour through pixel centers.
    Polygon,
}

/// Reduction applied to the candidates of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidatePolicy {
    /// Keep every candidate.
    #[default]
    All,
    /// Keep only the candidate with the greatest area; the earliest wins ties.
    LargestArea,
}

impl CandidatePolicy {
    pub fn apply(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        match self {
            CandidatePolicy::All => candidates,
            CandidatePolicy::LargestArea => {
                let mut best: Option<Candidate> = None;
                for candidate in candidates {
                    let replace = match &best {
                        Some(current) => candidate.area > current.area,
                        None => true,
                    };
                    if replace {
                        best = Some(candidate);
                    }
                }
                best.into_iter().collect()
            }
        }
    }
}

/// An integer pixel position in ROI-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A blob that passed the area gate and was fitted to a circle.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Rounded circle center.
    pub position: Position,
    /// Radius of the minimal enclosing circle, unrounded.
    pub radius: f64,
    /// Area under the configured metric.
    pub area: f64,
    /// Id of the originating blob within its frame.
    pub blob_id: u64,
}

/// Configuration of the Filter & Fit stage and the policy that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_area: f64,
    /// Accept blobs whose area equals `min_area`.
    pub inclusive: bool,
    pub area_metric: AreaMetric,
    pub policy: CandidatePolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_area: 30.0,
            inclusive: false,
            area_metric: AreaMetric::PixelCount,
            policy: CandidatePolicy::All,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(VisionError::Config(format!(
                "min_area must be a non-negative number, got {}",
                self.min_area
            )));
        }
        Ok(())
    }

    pub fn area_of(&self, blob: &Blob) -> f64 {
        match self.area_metric {
            AreaMetric::PixelCount => blob.pixel_count as f64,
            AreaMetric::Polygon => blob.polygon_area(),
        }
    }

    pub fn accepts(&self, area: f64) -> bool {
        if self.inclusive {
            area >= self.min_area
        } else {
            area > self.min_area
        }
    }

    /// Filters `blobs` by area and fits a circle to each survivor, in input order.
    /// The policy is not applied here.
    pub fn fit(&self, blobs: &[Blob]) -> Vec<Candidate> {
        blobs
            .iter()
            .filter_map(|blob| {
                let area = self.area_of(blob);
                if !self.accepts(area) {
                    return None;
                }
                let circle = min_enclosing_circle(&blob.contour)?;
                Some(Candidate {
                    position: Position::new(
                        circle.center.0.round() as i32,
                        circle.center.1.round() as i32,
                    ),
                    radius: circle.radius,
                    area,
                    blob_id: blob.id,
                })
            })
            .collect()
    }

    /// Filter & Fit followed by the configured policy.
    pub fn select(&self, blobs: &[Blob]) -> Vec<Candidate> {
        self.policy.apply(self.fit(blobs))
    }
}
