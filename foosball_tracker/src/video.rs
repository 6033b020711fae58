// A `FrameSource` over an OpenCV `VideoCapture`, for video files and cameras.
// Only built with the `video` feature, since it links the native OpenCV libraries.

use foosball_vision::{Frame, FrameSource, Result, VisionError};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{info, warn};

fn read_error(err: opencv::Error) -> VisionError {
    VisionError::SourceRead(err.to_string())
}

pub struct VideoSource {
    capture: VideoCapture,
    buffer: Mat,
    width: u32,
    height: u32,
}

impl VideoSource {
    pub fn open(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY).map_err(read_error)?;
        if !capture.is_opened().map_err(read_error)? {
            return Err(VisionError::SourceRead(format!("cannot open video `{path}`")));
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(read_error)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(read_error)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS).map_err(read_error)?;
        info!(path, width, height, fps, "opened video");

        Ok(Self {
            capture,
            buffer: Mat::default(),
            width,
            height,
        })
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        // --- 1. Grab & decode ---
        if !self.capture.read(&mut self.buffer).map_err(read_error)? || self.buffer.empty() {
            return Ok(None);
        }

        // --- 2. Copy the BGR samples out of the Mat ---
        let continuous;
        let mat = if self.buffer.is_continuous() {
            &self.buffer
        } else {
            continuous = self.buffer.try_clone().map_err(read_error)?;
            &continuous
        };
        self.width = mat.cols() as u32;
        self.height = mat.rows() as u32;
        let bytes = mat.data_bytes().map_err(read_error)?.to_vec();

        Frame::from_bgr(self.width, self.height, bytes).map(Some)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn release(&mut self) {
        if let Err(err) = self.capture.release() {
            warn!(error = %err, "failed to release video capture");
        }
    }
}
