//! Native camera capture through nokhwa.

use super::{Camera, CameraError, CaptureConfig, Frame, LeasedFrame, ReleaseTracker};
use nokhwa::pixel_format::LumaFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use std::sync::Arc;

/// A physical camera opened through the platform's native backend.
pub struct NokhwaCamera {
    device: Option<nokhwa::Camera>,
    max_outstanding: usize,
    sequence: u64,
    tracker: Arc<ReleaseTracker>,
}

impl NokhwaCamera {
    /// Creates an unopened camera handle.
    pub fn new() -> Self {
        Self {
            device: None,
            max_outstanding: 0,
            sequence: 0,
            tracker: ReleaseTracker::new(),
        }
    }

    /// Returns the buffer accounting for frames this camera handed out.
    pub fn tracker(&self) -> Arc<ReleaseTracker> {
        Arc::clone(&self.tracker)
    }
}

impl Default for NokhwaCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for NokhwaCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let requested = RequestedFormat::new::<LumaFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        let mut device = nokhwa::Camera::new(CameraIndex::Index(config.device_id), requested)
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?;
        device
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        tracing::info!(
            device = config.device_id,
            format = ?device.camera_format(),
            "Camera stream opened"
        );

        self.device = Some(device);
        self.max_outstanding = config.max_outstanding_frames;
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<LeasedFrame, CameraError> {
        let device = self.device.as_mut().ok_or(CameraError::NotInitialized)?;

        if self.tracker.outstanding() >= self.max_outstanding {
            return Err(CameraError::BuffersExhausted(self.max_outstanding));
        }

        let buffer = device
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let luma = buffer
            .decode_image::<LumaFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        self.sequence += 1;
        let (width, height) = (luma.width(), luma.height());
        let frame = Frame::new(luma.into_raw(), width, height, self.sequence);
        Ok(self.tracker.lease(frame))
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.stop_stream() {
                tracing::warn!(error = %e, "Failed to stop camera stream");
            }
        }
        tracing::info!("Camera closed");
    }
}
