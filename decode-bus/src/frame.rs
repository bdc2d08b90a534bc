use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use image::RgbImage;

use crate::error::{DecodeError, Result};

/// rgb24, interleaved
pub const BYTES_PER_PIXEL: usize = 3;

/// Pixel count above which an oversized frame is reported.
/// Frames larger than twice this are rejected unless limits are ignored.
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 89_478_485;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidConfig(format!(
                "invalid video size {}x{}",
                width, height
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                DecodeError::InvalidConfig(format!("video size {}x{} overflows", width, height))
            })?;
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Size in bytes of one raw frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl Display for FrameGeometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Outcome of checking a geometry against [`FrameLimits`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitCheck {
    Within,
    /// Above the limit but below the hard rejection threshold.
    Oversized,
}

/// Per-decoder image size safety limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLimits {
    max_pixels: Option<u64>,
}

impl FrameLimits {
    pub fn unlimited() -> Self {
        Self { max_pixels: None }
    }

    pub fn with_max_pixels(max_pixels: u64) -> Self {
        Self {
            max_pixels: Some(max_pixels),
        }
    }

    pub fn standard() -> Self {
        Self::with_max_pixels(DEFAULT_MAX_IMAGE_PIXELS)
    }

    pub fn from_ignore_flag(ignore_max_image_pixels: bool) -> Self {
        if ignore_max_image_pixels {
            Self::unlimited()
        } else {
            Self::standard()
        }
    }

    pub fn max_pixels(&self) -> Option<u64> {
        self.max_pixels
    }

    pub fn check(&self, geometry: FrameGeometry) -> Result<LimitCheck> {
        let Some(max) = self.max_pixels else {
            return Ok(LimitCheck::Within);
        };
        let pixels = geometry.pixels();
        if pixels > max.saturating_mul(2) {
            return Err(DecodeError::ImageDecode(format!(
                "image size ({} pixels) exceeds limit of {} pixels",
                pixels,
                max.saturating_mul(2)
            )));
        }
        if pixels > max {
            return Ok(LimitCheck::Oversized);
        }
        Ok(LimitCheck::Within)
    }
}

/// One decoded rgb24 video frame. Clones share the pixel buffer.
#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
}

impl Frame {
    /// Builds a frame from exactly `geometry.frame_len()` bytes.
    pub fn from_raw(geometry: FrameGeometry, data: Vec<u8>) -> Result<Self> {
        let expected = geometry.frame_len();
        if data.len() != expected {
            return Err(DecodeError::ImageDecode(format!(
                "buffer of {} bytes does not match {} rgb24 ({} bytes)",
                data.len(),
                geometry,
                expected
            )));
        }
        let image = RgbImage::from_raw(geometry.width(), geometry.height(), data).ok_or_else(
            || DecodeError::ImageDecode(format!("failed to build {} rgb image", geometry)),
        )?;
        Ok(Self {
            image: Arc::new(image),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Takes the pixel bytes, copying only if the buffer is still shared.
    pub fn into_raw(self) -> Vec<u8> {
        match Arc::try_unwrap(self.image) {
            Ok(image) => image.into_raw(),
            Err(shared) => shared.as_raw().clone(),
        }
    }

    /// Whether both frames share one pixel buffer.
    pub fn ptr_eq(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.geometry() == other.geometry() && self.as_raw() == other.as_raw())
    }
}

impl Eq for Frame {}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("len", &self.as_raw().len())
            .finish()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frame {{ size: {}, data: {} }}",
            self.geometry(),
            self.as_raw().len()
        )
    }
}

/// A frame and its immediate predecessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePair {
    pub previous: Frame,
    pub current: Frame,
}

impl FramePair {
    pub fn new(previous: Frame, current: Frame) -> Self {
        Self { previous, current }
    }

    pub fn into_tuple(self) -> (Frame, Frame) {
        (self.previous, self.current)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
