//! QR payload decoding.
//!
//! The scanner treats decoding as an opaque function from one frame to
//! zero or one payload string. [`Decoder`] is that seam; [`RqrrDecoder`]
//! is the production implementation.

mod rqrr_decoder;

pub use rqrr_decoder::RqrrDecoder;

use crate::capture::Frame;
use thiserror::Error;

/// Errors a decoder can report for a single frame.
///
/// None of these are fatal to a scan; the frame simply yields no payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame has no pixels.
    #[error("frame has no pixel data")]
    EmptyFrame,
    /// Pixel buffer length does not match the dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
    /// Rotation is not a multiple of 90 degrees.
    #[error("unsupported rotation of {0} degrees")]
    UnsupportedRotation(u32),
    /// Error reported by the decoding backend.
    #[error("decoder failure: {0}")]
    Backend(String),
}

/// Extracts at most one payload from a frame.
pub trait Decoder: Send + Sync {
    /// Decodes the frame, honoring its rotation.
    ///
    /// Returns `Ok(None)` when the frame contains no readable code.
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError>;
}
