//! Scanner configuration.
//!
//! Capture defaults target 640x480, which is enough resolution for
//! handheld QR codes while keeping decode time per frame low.

use crate::torch::FlashState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index.
    pub device_id: u32,
    /// Requested frame width in pixels.
    pub width: u32,
    /// Requested frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Frame buffers the producer may have on loan at once.
    pub max_outstanding_frames: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            max_outstanding_frames: 4,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Interval between frames at the configured rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.max_outstanding_frames == 0 {
            return Err(ConfigError::InvalidOutstandingFrames);
        }
        Ok(())
    }
}

/// Debounce and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Consecutive identical reads needed before a payload is confirmed.
    pub required_confirmations: u32,
    /// Session deadline in seconds (0 waits indefinitely).
    pub session_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            required_confirmations: 1,
            session_timeout_secs: 0,
        }
    }
}

impl ScannerConfig {
    /// Returns the session deadline, if one is configured.
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_secs > 0).then(|| Duration::from_secs(self.session_timeout_secs))
    }

    /// Checks the confirmation threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_confirmations == 0 {
            return Err(ConfigError::InvalidConfirmations);
        }
        Ok(())
    }
}

/// Torch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TorchConfig {
    /// Switch the torch on when the scanner starts.
    pub enabled_on_start: bool,
}

impl TorchConfig {
    /// Flash state the scanner starts in.
    pub fn initial_state(&self) -> FlashState {
        if self.enabled_on_start {
            FlashState::Enabled
        } else {
            FlashState::Disabled
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1-120.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// No frame buffers allowed on loan.
    #[error("at least one frame buffer must be available")]
    InvalidOutstandingFrames,
    /// Confirmation threshold of zero.
    #[error("required confirmations must be at least 1")]
    InvalidConfirmations,
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this layout.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[capture]` section.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// `[scanner]` section.
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// `[torch]` section.
    #[serde(default)]
    pub torch: TorchConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.scanner.validate()
    }
}
