use foosball_vision::{FrameReport, FrameSink};
use std::path::PathBuf;
use tracing::warn;

/// Saves the annotated image of every frame as `frame_NNNNNN.png`.
pub struct OverlayWriter {
    directory: PathBuf,
    written: u64,
}

impl OverlayWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            written: 0,
        }
    }
}

impl FrameSink for OverlayWriter {
    fn on_frame(&mut self, report: &FrameReport) {
        let Some(images) = &report.images else {
            return;
        };
        let path = self
            .directory
            .join(format!("frame_{:06}.png", report.frame_index));
        match images.annotated.save(&path) {
            Ok(()) => self.written += 1,
            // A failed overlay must not stop tracking.
            Err(err) => warn!(path = %path.display(), error = %err, "failed to write overlay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foosball_vision::{FrameImages, Region};
    use image::RgbImage;
    use std::sync::Arc;

    fn report(frame_index: u64, images: Option<FrameImages>) -> FrameReport {
        FrameReport {
            frame_index,
            frame_width: 8,
            frame_height: 8,
            region: Region {
                x0: 0,
                y0: 0,
                x1: 8,
                y1: 8,
            },
            foreground_pixels: 0,
            blob_count: 0,
            candidates: Vec::new(),
            images,
        }
    }

    #[test]
    fn writes_one_png_per_annotated_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = OverlayWriter::new(dir.path());
        let image = Arc::new(RgbImage::new(8, 8));
        let images = FrameImages {
            roi: Arc::clone(&image),
            annotated: image,
        };

        writer.on_frame(&report(3, Some(images)));
        writer.on_frame(&report(4, None));

        assert_eq!(writer.written, 1);
        assert!(dir.path().join("frame_000003.png").exists());
        assert!(!dir.path().join("frame_000004.png").exists());
    }
}
