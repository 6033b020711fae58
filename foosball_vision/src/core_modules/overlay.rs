// THEORY:
// The `overlay` module renders the human-facing picture of one frame's analysis.
// It is observational only: nothing it produces feeds back into detection, and
// it is only invoked when a caller has asked for annotated output.
//
// The annotated image is the ROI with every background pixel blacked out (the
// ROI "anded" with its own mask), the fitted circle of each candidate drawn as a
// green ring, and each candidate center marked with a small filled red dot.

use crate::core_modules::candidate::Candidate;
use crate::core_modules::mask::Mask;
use crate::core_modules::region::RegionView;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};

/// Ring color for fitted circles.
pub const CIRCLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Dot color for candidate centers.
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Concentric one pixel circles making up a ring.
const RING_THICKNESS: i32 = 2;
const CENTER_DOT_RADIUS: i32 = 3;

/// The ROI with background pixels set to black.
pub fn masked_roi(roi: &RegionView<'_>, mask: &Mask) -> RgbImage {
    RgbImage::from_fn(roi.width(), roi.height(), |x, y| {
        if mask.get(x as i64, y as i64) {
            Rgb(roi.pixel(x, y).to_rgb())
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// The masked ROI with each candidate's circle and center drawn on top.
/// Shapes reaching past the image edge are clipped.
pub fn annotate(roi: &RegionView<'_>, mask: &Mask, candidates: &[Candidate]) -> RgbImage {
    let mut image = masked_roi(roi, mask);
    for candidate in candidates {
        let center = (candidate.position.x, candidate.position.y);
        let radius = candidate.radius.round() as i32;
        for offset in 0..RING_THICKNESS {
            let ring_radius = radius.saturating_add(offset);
            draw_hollow_circle_mut(&mut image, center, ring_radius, CIRCLE_COLOR);
        }
        draw_filled_circle_mut(&mut image, center, CENTER_DOT_RADIUS, CENTER_COLOR);
    }
    image
}
