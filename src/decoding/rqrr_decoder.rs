//! QR detection and decoding with rqrr.

use super::{DecodeError, Decoder};
use crate::capture::Frame;
use image::{imageops, GrayImage};
use rqrr::PreparedImage;
use tracing::{debug, trace};

/// Decodes the first QR code found in a luma frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    /// Creates a decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
        let start = std::time::Instant::now();
        let upright = upright_image(frame)?;

        let (width, height) = (upright.width() as usize, upright.height() as usize);
        let mut prepared =
            PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                upright.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();

        trace!(
            sequence = frame.sequence(),
            grids = grids.len(),
            detect_ms = start.elapsed().as_millis(),
            "QR detection complete"
        );

        // Only the first code in view is used
        let Some(grid) = grids.first() else {
            return Ok(None);
        };

        match grid.decode() {
            Ok((_, content)) => Ok(Some(content)),
            Err(e) => {
                debug!(sequence = frame.sequence(), error = ?e, "Found QR grid but failed to decode");
                Ok(None)
            }
        }
    }
}

/// Validates the frame buffer and rotates it upright.
fn upright_image(frame: &Frame) -> Result<GrayImage, DecodeError> {
    if frame.is_empty() {
        return Err(DecodeError::EmptyFrame);
    }
    if !frame.is_valid() {
        return Err(DecodeError::BufferMismatch {
            expected: frame.pixel_count(),
            actual: frame.pixels().len(),
        });
    }

    let image = GrayImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
        .ok_or(DecodeError::BufferMismatch {
            expected: frame.pixel_count(),
            actual: frame.pixels().len(),
        })?;

    match frame.rotation_degrees() {
        0 => Ok(image),
        90 => Ok(imageops::rotate90(&image)),
        180 => Ok(imageops::rotate180(&image)),
        270 => Ok(imageops::rotate270(&image)),
        other => Err(DecodeError::UnsupportedRotation(other)),
    }
}
