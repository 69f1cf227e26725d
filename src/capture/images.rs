//! Image files replayed as a camera stream.

use super::{Camera, CameraError, CaptureConfig, Frame, LeasedFrame, ReleaseTracker};
use image::GrayImage;
use std::path::PathBuf;
use std::sync::Arc;

/// Replays still images as consecutive camera frames.
///
/// Images are loaded and converted to luma when the camera opens. The
/// sequence is played `repeat` times and then capture reports
/// [`CameraError::EndOfStream`].
pub struct ImageSequenceCamera {
    paths: Vec<PathBuf>,
    rotation_degrees: u32,
    repeat: u32,
    images: Vec<GrayImage>,
    max_outstanding: Option<usize>,
    cursor: usize,
    sequence: u64,
    tracker: Arc<ReleaseTracker>,
}

impl ImageSequenceCamera {
    /// Plays `paths` in order, once each, with no rotation.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            rotation_degrees: 0,
            repeat: 1,
            images: Vec::new(),
            max_outstanding: None,
            cursor: 0,
            sequence: 0,
            tracker: ReleaseTracker::new(),
        }
    }

    /// Tags every frame with the given sensor rotation.
    pub fn with_rotation(mut self, rotation_degrees: u32) -> Self {
        self.rotation_degrees = rotation_degrees;
        self
    }

    /// Plays the sequence `repeat` times (at least once).
    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Returns the buffer accounting for frames this camera handed out.
    pub fn tracker(&self) -> Arc<ReleaseTracker> {
        Arc::clone(&self.tracker)
    }

    fn total_frames(&self) -> usize {
        self.images.len() * self.repeat as usize
    }
}

impl Camera for ImageSequenceCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        if self.paths.is_empty() {
            return Err(CameraError::DeviceNotFound("no image paths given".into()));
        }

        let mut images = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let image = image::open(path)
                .map_err(|e| CameraError::OpenFailed(format!("{}: {}", path.display(), e)))?;
            images.push(image.to_luma8());
        }

        tracing::info!(
            images = images.len(),
            repeat = self.repeat,
            rotation = self.rotation_degrees,
            "Image sequence opened"
        );

        self.images = images;
        self.max_outstanding = Some(config.max_outstanding_frames);
        self.cursor = 0;
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<LeasedFrame, CameraError> {
        let max_outstanding = self.max_outstanding.ok_or(CameraError::NotInitialized)?;

        if self.cursor >= self.total_frames() {
            return Err(CameraError::EndOfStream);
        }
        if self.tracker.outstanding() >= max_outstanding {
            return Err(CameraError::BuffersExhausted(max_outstanding));
        }

        let image = &self.images[self.cursor % self.images.len()];
        self.cursor += 1;
        self.sequence += 1;

        let frame = Frame::new(
            image.as_raw().clone(),
            image.width(),
            image.height(),
            self.sequence,
        )
        .with_rotation(self.rotation_degrees);

        Ok(self.tracker.lease(frame))
    }

    fn is_open(&self) -> bool {
        self.max_outstanding.is_some()
    }

    fn close(&mut self) {
        self.images.clear();
        self.max_outstanding = None;
        tracing::info!("Image sequence closed");
    }
}
