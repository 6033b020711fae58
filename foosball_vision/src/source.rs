// THEORY:
// The `source` module is the input boundary of the tracker. Anything that can hand
// out decoded frames one at a time (a camera, a video file, a folder of stills,
// a vector in a test) implements `FrameSource`.
//
// Key architectural principles:
// 1.  **Three Outcomes Per Read**: `Ok(Some(frame))` is a frame, `Ok(None)` is the
//     end of the stream, and `Err(_)` is a read failure. Exhaustion is not an error.
// 2.  **Scoped Resource**: A source is acquired once and must be released exactly
//     once, however the loop ends. `SourceGuard` owns the source for the duration
//     of a run and releases it either explicitly or when it is dropped, which also
//     covers unwinding out of a panicking iteration.
// 3.  **Substitutable**: The loop only sees the trait, so tests drive it with
//     `MemorySource` and count releases.

use crate::core_modules::frame::Frame;
use crate::error::{Result, VisionError};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// A supplier of successive frames.
pub trait FrameSource {
    /// Reads the next frame. `Ok(None)` signals the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Width of the frames currently being produced, 0 if unknown.
    /// The session reads the size after every frame and trusts the frame itself
    /// when the two disagree.
    fn width(&self) -> u32;

    /// Height of the frames currently being produced, 0 if unknown.
    fn height(&self) -> u32;

    /// Releases the underlying device or file handles.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Owns a source for one run and guarantees it is released exactly once.
pub struct SourceGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    /// Reads from the wrapped source. A released source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Ok(None);
        }
        self.source.next_frame()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases the source. Later calls, including the one on drop, do nothing.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Serves frames from memory. Mostly used to drive the loop in tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
    /// Error reported once the frames run out, instead of end of stream.
    trailing_error: Option<String>,
    current_size: (u32, u32),
    releases: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        let frames: VecDeque<Frame> = frames.into_iter().collect();
        let current_size = frames
            .front()
            .map_or((0, 0), |frame| (frame.width(), frame.height()));
        Self {
            frames,
            trailing_error: None,
            current_size,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fails with a read error after the last frame instead of ending cleanly.
    pub fn with_read_error(mut self, message: impl Into<String>) -> Self {
        self.trailing_error = Some(message.into());
        self
    }

    /// Shared counter of `release` calls, still readable after the source is gone.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.current_size = (frame.width(), frame.height());
                Ok(Some(frame))
            }
            None => match self.trailing_error.take() {
                Some(message) => Err(VisionError::SourceRead(message)),
                None => Ok(None),
            },
        }
    }

    fn width(&self) -> u32 {
        self.current_size.0
    }

    fn height(&self) -> u32 {
        self.current_size.1
    }

    fn release(&mut self) {
        self.frames.clear();
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reads a directory of still images in file-name order, one image per frame.
#[derive(Debug)]
pub struct ImageSequenceSource {
    directory: PathBuf,
    paths: VecDeque<PathBuf>,
    current_size: (u32, u32),
}

impl ImageSequenceSource {
    /// Lists every file in `directory` whose extension the `image` crate recognizes.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&directory)? {
            let path = entry?.path();
            if path.is_file() && image::ImageFormat::from_path(&path).is_ok() {
                paths.push(path);
            }
        }
        paths.sort();

        info!(
            directory = %directory.display(),
            frames = paths.len(),
            "opened image sequence"
        );
        Ok(Self {
            directory,
            paths: paths.into(),
            current_size: (0, 0),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|err| VisionError::SourceRead(format!("{}: {err}", path.display())))?
            .to_rgb8();
        self.current_size = image.dimensions();
        debug!(path = %path.display(), "decoded frame");
        Ok(Some(Frame::from_rgb_image(&image)))
    }

    fn width(&self) -> u32 {
        self.current_size.0
    }

    fn height(&self) -> u32 {
        self.current_size.1
    }

    fn release(&mut self) {
        self.paths.clear();
    }
}
