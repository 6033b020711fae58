// THEORY:
// The `BlobDetector` is the engine of the Blob Extraction stage. It finds every
// closed border in a `Mask`, outer borders and hole borders alike, and describes
// each one as a blob.
//
// Key architectural principles & algorithm steps:
// 1.  **Border Following**: The mask is rendered as a grayscale image with a one
//     pixel background frame around it and handed to `imageproc`'s Suzuki-Abe
//     border follower. Foreground is 8-connected. The frame keeps regions that
//     touch the mask edge closed; coordinates are shifted back afterwards.
// 2.  **Full Hierarchy**: Every border becomes a blob. A ring yields two: its outer
//     border and the border of its hole. A region sitting inside a hole yields its
//     own blobs as well. The area gate downstream decides what survives.
// 3.  **Raster Order**: Borders come out in the raster order of the pixel where
//     the follower first met them, and blob ids follow that order.
// 4.  **Enclosed Area**: The pixel count of a blob is everything on or inside its
//     contour. A 4-connected flood fill from outside the contour's bounding box
//     reaches exactly the pixels that are neither; the rest are counted.
// 5.  **Stateless Utility**: `find_blobs` takes one mask and returns the blobs of
//     that mask. It has no memory of previous frames.

use crate::core_modules::blob::{Blob, BorderKind, Point};
use crate::core_modules::mask::Mask;
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};

pub mod blob_detector {
    use super::*; // Make structs from parent module available.

    /// Background pixels added on every side before border following.
    const PAD: u32 = 1;

    /// The main function of the blob extraction layer.
    /// Takes a mask and returns one blob per border found in it.
    pub fn find_blobs(mask: &Mask) -> Vec<Blob> {
        if mask.foreground_count() == 0 {
            return Vec::new();
        }

        let padded = padded_image(mask);
        let mut blobs: Vec<Blob> = Vec::new();

        for contour in find_contours::<u32>(&padded) {
            let points: Vec<Point> = contour
                .points
                .iter()
                .map(|p| Point::new(p.x.saturating_sub(PAD), p.y.saturating_sub(PAD)))
                .collect();
            let Some(bounding_box) = bounds(&points) else {
                continue;
            };
            let border = match contour.border_type {
                BorderType::Outer => BorderKind::Outer,
                BorderType::Hole => BorderKind::Hole,
            };
            let pixel_count = enclosed_pixels(&points, bounding_box);

            blobs.push(Blob {
                id: blobs.len() as u64,
                border,
                contour: points,
                pixel_count,
                bounding_box,
            });
        }

        blobs
    }

    /// The mask as 0/255 luma with a background frame of `PAD` pixels.
    fn padded_image(mask: &Mask) -> GrayImage {
        let pad = PAD as i64;
        GrayImage::from_fn(mask.width() + 2 * PAD, mask.height() + 2 * PAD, |x, y| {
            let on = mask.get(x as i64 - pad, y as i64 - pad);
            Luma([if on { 255 } else { 0 }])
        })
    }

    fn bounds(points: &[Point]) -> Option<(Point, Point)> {
        let first = points.first()?;
        let (mut min, mut max) = (*first, *first);
        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        Some((min, max))
    }

    /// Counts the pixels on or inside a closed contour.
    fn enclosed_pixels(contour: &[Point], (min, max): (Point, Point)) -> usize {
        // --- 1. Grid over the bounding box plus a one cell margin ---
        let width = (max.x - min.x + 3) as usize;
        let height = (max.y - min.y + 3) as usize;
        let mut blocked = vec![false; width * height];
        for point in contour {
            let cx = (point.x - min.x + 1) as usize;
            let cy = (point.y - min.y + 1) as usize;
            blocked[cy * width + cx] = true;
        }

        // --- 2. Flood the outside from the margin corner ---
        let mut outside = 0usize;
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        blocked[0] = true;
        while let Some((x, y)) = stack.pop() {
            outside += 1;
            let neighbours = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbours {
                if nx >= width || ny >= height {
                    continue;
                }
                let index = ny * width + nx;
                if !blocked[index] {
                    blocked[index] = true;
                    stack.push((nx, ny));
                }
            }
        }

        // --- 3. Whatever the flood missed is border or interior ---
        width * height - outside
    }
}
