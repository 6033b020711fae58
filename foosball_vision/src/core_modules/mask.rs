// THEORY:
// The `Mask` module is the Color Segmentation stage. It turns the region of
// interest into a binary image: a pixel is foreground iff its hue, saturation and
// value all lie inside the configured `ColorRange`, bounds inclusive.
//
// Thresholding happens on HSV rather than on raw channels because the ball's hue
// barely moves when the lighting over the table changes, while its raw BGR values
// swing widely. No morphological cleanup is applied: the mask is exactly the set
// of in-range pixels.

use crate::core_modules::pixel::pixel::{HUE_MAX, Hsv};
use crate::core_modules::region::RegionView;
use crate::error::{Result, VisionError};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Inclusive lower/upper bounds on each HSV channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl Default for ColorRange {
    /// The yellow of the tracked ball.
    fn default() -> Self {
        Self {
            lower: Hsv::new(14, 130, 20),
            upper: Hsv::new(24, 255, 255),
        }
    }
}

impl ColorRange {
    pub fn new(lower: Hsv, upper: Hsv) -> Result<Self> {
        let range = Self { lower, upper };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lower.hue > HUE_MAX || self.upper.hue > HUE_MAX {
            return Err(VisionError::Config(format!(
                "hue bounds must be within 0..={HUE_MAX}, got {}..={}",
                self.lower.hue, self.upper.hue
            )));
        }
        let channels = [
            ("hue", self.lower.hue, self.upper.hue),
            ("saturation", self.lower.saturation, self.upper.saturation),
            ("value", self.lower.value, self.upper.value),
        ];
        for (name, lower, upper) in channels {
            if lower > upper {
                return Err(VisionError::Config(format!(
                    "{name} lower bound {lower} exceeds upper bound {upper}"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.hue..=self.upper.hue).contains(&hsv.hue)
            && (self.lower.saturation..=self.upper.saturation).contains(&hsv.saturation)
            && (self.lower.value..=self.upper.value).contains(&hsv.value)
    }
}

/// A single-channel binary image with the extent of the region it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether `(x, y)` is foreground. Coordinates outside the mask are background.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let index = y as usize * self.width as usize + x as usize;
        self.data[index] = foreground;
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }

    /// Renders the mask as 255 (foreground) / 0 (background).
    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x as i64, y as i64) { 255 } else { 0 }])
        })
    }
}

/// Produces masks for one fixed color range.
#[derive(Debug, Clone)]
pub struct ColorSegmenter {
    range: ColorRange,
}

impl ColorSegmenter {
    pub fn new(range: ColorRange) -> Result<Self> {
        range.validate()?;
        Ok(Self { range })
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    /// Converts every ROI pixel to HSV and marks the in-range ones.
    pub fn segment(&self, roi: &RegionView<'_>) -> Mask {
        let mut mask = Mask::new(roi.width(), roi.height());
        for y in 0..roi.height() {
            for x in 0..roi.width() {
                if self.range.contains(roi.pixel(x, y).to_hsv()) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::Frame;
    use crate::core_modules::pixel::pixel::Bgr;
    use crate::core_modules::region::RegionSpec;

    #[test]
    fn bounds_are_inclusive_on_every_channel() {
        let range = ColorRange::default();
        assert!(range.contains(Hsv::new(14, 130, 20)));
        assert!(range.contains(Hsv::new(24, 255, 255)));
        assert!(!range.contains(Hsv::new(13, 200, 200)));
        assert!(!range.contains(Hsv::new(25, 200, 200)));
        assert!(!range.contains(Hsv::new(20, 129, 200)));
        assert!(!range.contains(Hsv::new(20, 200, 19)));
    }

    #[test]
    fn inverted_or_out_of_wheel_ranges_are_rejected() {
        assert!(ColorRange::new(Hsv::new(30, 0, 0), Hsv::new(20, 255, 255)).is_err());
        assert!(ColorRange::new(Hsv::new(0, 0, 0), Hsv::new(180, 255, 255)).is_err());
        assert!(ColorRange::new(Hsv::new(0, 0, 0), Hsv::new(179, 255, 255)).is_ok());
    }

    #[test]
    fn segment_marks_only_in_range_pixels() {
        let mut frame = Frame::filled(4, 3, Bgr::new(40, 120, 30));
        frame.set_pixel(1, 1, Bgr::new(0, 180, 255)); // yellow
        frame.set_pixel(2, 1, Bgr::new(0, 0, 255)); // red, hue 0
        frame.set_pixel(3, 2, Bgr::new(0, 10, 12)); // yellowish but too dark

        let view = RegionSpec::full_frame().view(&frame).unwrap();
        let segmenter = ColorSegmenter::new(ColorRange::default()).unwrap();
        let mask = segmenter.segment(&view);

        assert_eq!((mask.width(), mask.height()), (4, 3));
        assert_eq!(mask.foreground_count(), 1);
        assert!(mask.get(1, 1));
        assert!(!mask.get(2, 1));
        assert!(!mask.get(3, 2));
        assert!(!mask.get(-1, 0));
    }

    #[test]
    fn luma_rendering_uses_full_scale() {
        let mut mask = Mask::new(2, 1);
        mask.set(1, 0, true);
        let image = mask.to_luma_image();
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [255]);
    }
}
