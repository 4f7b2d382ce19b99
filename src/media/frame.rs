// SPDX-License-Identifier: GPL-3.0-only

//! Frame and pixel format types shared by every pipeline stage

use crate::errors::ConversionError;
use std::sync::Arc;

/// Pixel layout of a frame buffer
///
/// All formats are 8 bits per channel and tightly packed (no row padding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// R G B A, 4 bytes per pixel. Canonical format on the GPU side.
    Rgba,
    /// R G B, 3 bytes per pixel. Input of the YUYV packer.
    Rgb,
    /// B G R A, 4 bytes per pixel
    Bgra,
    /// Packed 4:2:2 (Y0 U Y1 V), 2 bytes per pixel
    Yuyv,
    /// Single-channel grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel (YUYV averages to 2)
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Rgb => 3,
            PixelFormat::Yuyv => 2,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Map a V4L2 FourCC to a pixel format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"RGB3" => Some(PixelFormat::Rgb),
            b"AB24" => Some(PixelFormat::Rgba),
            b"AR24" => Some(PixelFormat::Bgra),
            b"GREY" => Some(PixelFormat::Gray8),
            _ => None,
        }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, `None` for empty sizes
    pub fn aspect(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// An immutable video frame
///
/// Stages that change pixels produce a new `Frame`; the buffer is shared by
/// reference count so handing a frame to the next stage never copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
}

impl Frame {
    /// Build a frame, validating dimensions and buffer length
    ///
    /// Extra trailing bytes are accepted and ignored by every consumer.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: impl Into<Arc<[u8]>>,
    ) -> Result<Self, ConversionError> {
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions { width, height });
        }
        let data = data.into();
        let expected = Self::byte_len(width, height, format);
        if data.len() < expected {
            return Err(ConversionError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Frame filled with a single RGB colour
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, ConversionError> {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height, PixelFormat::Rgb))
            .collect();
        Self::new(width, height, PixelFormat::Rgb, data)
    }

    /// Frame filled with a single RGBA colour
    pub fn solid_rgba(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, ConversionError> {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(Self::byte_len(width, height, PixelFormat::Rgba))
            .collect();
        Self::new(width, height, PixelFormat::Rgba, data)
    }

    /// Required buffer length for the given dimensions and format
    pub fn byte_len(width: u32, height: u32, format: PixelFormat) -> usize {
        width as usize * height as usize * format.bytes_per_pixel()
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check that the buffer still covers the dimensions
    ///
    /// Fields are public, so a frame built by hand may not have gone through
    /// [`Frame::new`].
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = Self::byte_len(self.width, self.height, self.format);
        if self.data.len() < expected {
            return Err(ConversionError::BufferTooSmall {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Pixel bytes without any trailing padding
    ///
    /// Panics if the buffer is shorter than the dimensions require; call
    /// [`Frame::validate`] first for frames not built with [`Frame::new`].
    pub fn pixels(&self) -> &[u8] {
        &self.data[..Self::byte_len(self.width, self.height, self.format)]
    }

    /// A copy of this frame with scanline order reversed
    pub fn flipped_vertical(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            format: self.format,
            data: flip_rows(self.pixels(), self.stride()).into(),
        }
    }
}

/// Reverse the row order of a tightly packed image buffer
pub fn flip_rows(data: &[u8], row_bytes: usize) -> Vec<u8> {
    if row_bytes == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks_exact(row_bytes).rev() {
        out.extend_from_slice(row);
    }
    out
}
