// THEORY:
// The `Frame` module is the raw input container of the tracker. A `Frame` is one
// decoded picture from the video stream: a rectangular grid of interleaved BGR
// samples with the width and height known at capture time.
//
// Key architectural principles:
// 1.  **Dumb Data Container**: A `Frame` knows how to hand out samples and convert
//     itself to and from the `image` crate's RGB buffers. It knows nothing about
//     regions, colors of interest, or blobs.
// 2.  **Loop Ownership**: A frame belongs to the single loop iteration that read it
//     and is dropped at the end of that iteration. Nothing retains it across frames.
// 3.  **Checked Construction**: Raw buffers from external decoders are length
//     checked once, at construction, so every later access can index directly.

use crate::core_modules::pixel::pixel::Bgr;
use crate::error::{Result, VisionError};
use image::{Rgb, RgbImage};

/// Number of interleaved channels per sample.
pub const CHANNELS: usize = 3;

/// A single decoded video frame in BGR byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps an interleaved BGR buffer. The buffer must hold exactly
    /// `width * height * 3` bytes.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(VisionError::InvalidFrame(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a frame where every sample is `color`.
    pub fn filled(width: u32, height: u32, color: Bgr) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            data.extend_from_slice(&[color.blue, color.green, color.red]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Converts an RGB image (as decoded by the `image` crate) into a BGR frame.
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let mut data = Vec::with_capacity(image.as_raw().len());
        for rgb in image.as_raw().chunks_exact(CHANNELS) {
            data.extend_from_slice(&[rgb[2], rgb[1], rgb[0]]);
        }
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| Rgb(self.pixel(x, y).to_rgb()))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the sample at `(x, y)`.
    ///
    /// Panics if the coordinate lies outside the frame.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Bgr {
        let index = self.byte_index(x, y);
        Bgr::from_slice(&self.data[index..index + CHANNELS])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Bgr) {
        let index = self.byte_index(x, y);
        self.data[index..index + CHANNELS].copy_from_slice(&[color.blue, color.green, color.red]);
    }

    /// Paints the rectangle with top-left `(x, y)` and the given size, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Bgr) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                self.set_pixel(col, row, color);
            }
        }
    }

    #[inline]
    fn byte_index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} frame",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}
