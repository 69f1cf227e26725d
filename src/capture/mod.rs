//! Camera input and frame handling.
//!
//! This module provides abstractions for capturing frames from a camera
//! (or a replayed image sequence) and managing capture configuration.
//! Frames are leased to the scanner and returned when processing ends.

mod camera;
mod config;
#[cfg(feature = "camera")]
mod device;
mod frame;
mod images;
mod lease;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, ConfigError, FileConfig, ScannerConfig, TorchConfig};
#[cfg(feature = "camera")]
pub use device::NokhwaCamera;
pub use frame::Frame;
pub use images::ImageSequenceCamera;
pub use lease::{LeasedFrame, ReleaseFrame, ReleaseTracker};
