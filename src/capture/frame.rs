//! Frame type representing a captured luma image with metadata.

use std::time::Instant;

/// A single captured frame from the camera.
///
/// Pixels are 8-bit luma, one byte per pixel, row-major. The rotation
/// records how far the sensor image must be turned clockwise to be upright.
#[derive(Clone)]
pub struct Frame {
    /// Raw luma pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Clockwise rotation (degrees) needed to display the frame upright.
    rotation_degrees: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new upright frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            rotation_degrees: 0,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Sets the rotation reported by the sensor for this frame.
    pub fn with_rotation(mut self, rotation_degrees: u32) -> Self {
        self.rotation_degrees = rotation_degrees;
        self
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the clockwise rotation in degrees.
    #[inline]
    pub fn rotation_degrees(&self) -> u32 {
        self.rotation_degrees
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns true if the frame carries no pixel data at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && self.pixels.len() == self.pixel_count()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation_degrees", &self.rotation_degrees)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(vec![0u8; 640 * 480], 640, 480, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.rotation_degrees(), 0);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let frame = Frame::new(vec![0u8; 100], 640, 480, 1);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_empty_frame_is_not_valid() {
        let frame = Frame::new(Vec::new(), 0, 0, 1);
        assert!(frame.is_empty());
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_rotation_is_kept() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, 7).with_rotation(90);
        assert_eq!(frame.rotation_degrees(), 90);
        assert_eq!(frame.sequence(), 7);
    }
}
