//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over frame producers,
//! allowing for real camera input, image files and mock implementations
//! for testing. Every producer leases its frames out and expects each
//! lease to be released exactly once.

use super::{CaptureConfig, Frame, LeasedFrame, ReleaseTracker};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No device matched the requested id.
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    /// The device exists but could not be opened.
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    /// The device rejected the requested format.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// Reading a frame failed.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// Every frame buffer is still leased.
    #[error("all {0} frame buffers are on loan")]
    BuffersExhausted(usize),
    /// A finite source has no frames left.
    #[error("frame source is exhausted")]
    EndOfStream,
    /// Capture was attempted before `open`.
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for frame producers.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame, leasing its buffer to the caller.
    fn capture(&mut self) -> Result<LeasedFrame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Mock camera for testing that generates synthetic frames.
///
/// Models a platform image queue with a fixed number of buffers: once
/// `max_outstanding_frames` leases are live, capture fails until one is
/// released.
#[derive(Debug)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    tracker: Arc<ReleaseTracker>,
}

impl MockCamera {
    /// Creates a closed mock camera.
    pub fn new() -> Self {
        Self {
            config: None,
            sequence: 0,
            tracker: ReleaseTracker::new(),
        }
    }

    /// Returns the buffer accounting for frames this camera handed out.
    pub fn tracker(&self) -> Arc<ReleaseTracker> {
        Arc::clone(&self.tracker)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<LeasedFrame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        if self.tracker.outstanding() >= config.max_outstanding_frames {
            return Err(CameraError::BuffersExhausted(config.max_outstanding_frames));
        }

        // Deterministic gradient; contains no QR code
        let pixel_count = (config.width * config.height) as usize;
        let pixels: Vec<u8> = (0..pixel_count)
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        let frame = Frame::new(pixels, config.width, config.height, self.sequence);
        Ok(self.tracker.lease(frame))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockCamera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig::with_dimensions(32, 24);

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.frame().is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_unreleased_frames_stall_capture() {
        let mut camera = MockCamera::new();
        let config = CaptureConfig {
            max_outstanding_frames: 2,
            ..CaptureConfig::with_dimensions(8, 8)
        };
        camera.open(&config).unwrap();

        let first = camera.capture().unwrap();
        let _second = camera.capture().unwrap();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::BuffersExhausted(2))
        ));

        first.release();
        assert!(camera.capture().is_ok());
        assert_eq!(camera.tracker().released(), 2);
    }
}
