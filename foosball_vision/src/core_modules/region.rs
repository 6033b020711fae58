// THEORY:
// The `Region` module is the first stage of the per-frame pipeline. It restricts
// analysis to the band of the table where the ball can actually be seen, which
// removes the rods, the players' hands, and the scoreboard from the search.
//
// Key architectural principles:
// 1.  **Linear in the Frame Size**: Each edge of the rectangle is `dimension *
//     numerator / denominator + offset`, evaluated in integers. The deployed crop
//     is `x in [W/3 + 30, 2W/3 + 80)`, full height.
// 2.  **Recomputed Per Frame**: The rectangle is resolved from the dimensions of
//     every frame rather than cached, so sources that change resolution mid-stream
//     keep working.
// 3.  **Clamp, Don't Abort**: Edges that fall outside the frame are clamped to it.
//     Only a rectangle that is still empty after clamping is an error.
// 4.  **Borrowed View**: Selection returns a `RegionView`, a non-owning window into
//     the frame addressed in ROI-local coordinates. No pixels are copied.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Bgr;
use crate::error::{Result, VisionError};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One edge of the crop rectangle, as a linear function of a frame dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub numerator: u32,
    pub denominator: u32,
    /// Pixels added after scaling. May be negative.
    pub offset: i64,
}

impl Edge {
    pub const fn new(numerator: u32, denominator: u32, offset: i64) -> Self {
        Self {
            numerator,
            denominator,
            offset,
        }
    }

    /// The edge at `numerator / denominator` of the dimension, no offset.
    pub const fn fraction(numerator: u32, denominator: u32) -> Self {
        Self::new(numerator, denominator, 0)
    }

    /// Resolves the edge for a concrete dimension. The scaled part is floored
    /// and the offset saturates at the `i64` range.
    pub fn resolve(&self, dimension: u32) -> i64 {
        let scaled = (dimension as i64 * self.numerator as i64)
            .checked_div(self.denominator as i64)
            .unwrap_or(0);
        scaled.saturating_add(self.offset)
    }
}

/// A concrete, non-empty rectangle `[y0:y1, x0:x1]` inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Describes how the region of interest is derived from the frame size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSpec {
    pub x_start: Edge,
    pub x_end: Edge,
    pub y_start: Edge,
    pub y_end: Edge,
}

impl Default for RegionSpec {
    /// The crop used on the recorded table footage: the central band of the
    /// width, shifted right, over the full height.
    fn default() -> Self {
        Self {
            x_start: Edge::new(1, 3, 30),
            x_end: Edge::new(2, 3, 80),
            y_start: Edge::fraction(0, 1),
            y_end: Edge::fraction(1, 1),
        }
    }
}

impl RegionSpec {
    /// Edges covering the whole frame.
    pub fn full_frame() -> Self {
        Self {
            x_start: Edge::fraction(0, 1),
            x_end: Edge::fraction(1, 1),
            y_start: Edge::fraction(0, 1),
            y_end: Edge::fraction(1, 1),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, edge) in [
            ("x_start", &self.x_start),
            ("x_end", &self.x_end),
            ("y_start", &self.y_start),
            ("y_end", &self.y_end),
        ] {
            if edge.denominator == 0 {
                return Err(VisionError::Config(format!(
                    "region edge `{name}` has a zero denominator"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the rectangle for a `width` x `height` frame, clamping it to the frame.
    pub fn select(&self, width: u32, height: u32) -> Result<Region> {
        let raw = (
            self.x_start.resolve(width),
            self.y_start.resolve(height),
            self.x_end.resolve(width),
            self.y_end.resolve(height),
        );
        let clamp = |value: i64, limit: u32| value.clamp(0, limit as i64) as u32;
        let region = Region {
            x0: clamp(raw.0, width),
            y0: clamp(raw.1, height),
            x1: clamp(raw.2, width),
            y1: clamp(raw.3, height),
        };

        if region.x1 <= region.x0 || region.y1 <= region.y0 {
            return Err(VisionError::InvalidRegion(format!(
                "x {}..{} y {}..{} is empty inside a {}x{} frame",
                raw.0, raw.2, raw.1, raw.3, width, height
            )));
        }

        let resolved = (
            region.x0 as i64,
            region.y0 as i64,
            region.x1 as i64,
            region.y1 as i64,
        );
        if raw != resolved {
            debug!(?region, width, height, "region clamped to frame bounds");
        }

        Ok(region)
    }

    /// Selects the region for `frame` and returns a view into it.
    pub fn view<'a>(&self, frame: &'a Frame) -> Result<RegionView<'a>> {
        let region = self.select(frame.width(), frame.height())?;
        Ok(RegionView { frame, region })
    }
}

/// A borrowed window into a frame, addressed in ROI-local coordinates.
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    frame: &'a Frame,
    region: Region,
}

impl<'a> RegionView<'a> {
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn width(&self) -> u32 {
        self.region.width()
    }

    pub fn height(&self) -> u32 {
        self.region.height()
    }

    /// The sample at ROI-local `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Bgr {
        debug_assert!(x < self.width() && y < self.height());
        self.frame.pixel(self.region.x0 + x, self.region.y0 + y)
    }

    /// Copies the view into an RGB image of the ROI's size.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            Rgb(self.pixel(x, y).to_rgb())
        })
    }
}
