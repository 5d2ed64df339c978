//! Raw RGB frame buffer.
//!
//! The stream pump owns the capture buffer; the frame processor works on an
//! independent copy so detection always sees pristine pixels.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ColorType, RgbImage};

use crate::error::{MediaError, MediaResult};

/// One video frame: packed RGB24 pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB bytes, length = width * height * 3.
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Create a frame from raw bytes, validating the buffer length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(MediaError::internal(format!(
                "Invalid frame buffer length: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer length in bytes for the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Wrap an owned `RgbImage`.
    pub fn from_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Copy the pixels into an `RgbImage` for imaging operations.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame buffer length validated at construction")
    }

    /// Move the pixels into an `RgbImage` without copying.
    pub fn into_image(self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data)
            .expect("frame buffer length validated at construction")
    }

    /// Resize to exactly `width` x `height` (the pump's latency lever).
    pub fn resize(&self, width: u32, height: u32) -> RgbFrame {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let img = self.to_image();
        let resized = imageops::resize(&img, width, height, imageops::FilterType::Triangle);
        RgbFrame::from_image(resized)
    }

    /// Encode as JPEG at the given quality (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> MediaResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode(&self.data, self.width, self.height, ColorType::Rgb8)
            .map_err(|e| MediaError::encode(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> RgbFrame {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(RgbFrame::byte_len(width, height))
            .collect();
        RgbFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        assert!(RgbFrame::new(4, 4, vec![0; 10]).is_err());
    }

    #[test]
    fn test_image_roundtrip() {
        let frame = solid_frame(8, 6, [10, 20, 30]);
        let back = RgbFrame::from_image(frame.to_image());
        assert_eq!(back, frame);
    }

    #[test]
    fn test_resize_dimensions() {
        let frame = solid_frame(64, 48, [0, 0, 0]);
        let resized = frame.resize(32, 24);
        assert_eq!((resized.width, resized.height), (32, 24));
        assert_eq!(resized.data.len(), RgbFrame::byte_len(32, 24));
    }

    #[test]
    fn test_resize_same_size_is_copy() {
        let frame = solid_frame(16, 12, [1, 2, 3]);
        assert_eq!(frame.resize(16, 12), frame);
    }

    #[test]
    fn test_jpeg_encode_produces_jpeg_magic() {
        let frame = solid_frame(16, 16, [200, 100, 50]);
        let bytes = frame.encode_jpeg(70).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
