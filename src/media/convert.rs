// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format normalization
//!
//! The compositor consumes RGBA and the YUYV packer consumes RGB. Frames in
//! any other supported layout are converted here; a frame that cannot be
//! converted is dropped by the caller.

use super::frame::{Frame, PixelFormat};
use super::yuyv::yuyv_to_rgb;
use crate::errors::ConversionError;

/// Normalize a frame to RGBA (alpha 255 where the source has none)
pub fn to_rgba(frame: &Frame) -> Result<Frame, ConversionError> {
    frame.validate()?;
    let data: Vec<u8> = match frame.format {
        PixelFormat::Rgba => return Ok(frame.clone()),
        PixelFormat::Rgb => rgb_to_rgba(frame.pixels()),
        PixelFormat::Bgra => {
            let mut rgba = frame.pixels().to_vec();
            for px in rgba.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            rgba
        }
        PixelFormat::Gray8 => frame
            .pixels()
            .iter()
            .flat_map(|&g| [g, g, g, 255])
            .collect(),
        PixelFormat::Yuyv => rgb_to_rgba(&yuyv_to_rgb(frame.pixels(), frame.width, frame.height)?),
    };
    Frame::new(frame.width, frame.height, PixelFormat::Rgba, data)
}

/// Normalize a frame to RGB, dropping alpha
pub fn to_rgb(frame: &Frame) -> Result<Frame, ConversionError> {
    frame.validate()?;
    let data: Vec<u8> = match frame.format {
        PixelFormat::Rgb => return Ok(frame.clone()),
        PixelFormat::Rgba => frame
            .pixels()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        PixelFormat::Bgra => frame
            .pixels()
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
        PixelFormat::Gray8 => frame.pixels().iter().flat_map(|&g| [g, g, g]).collect(),
        PixelFormat::Yuyv => yuyv_to_rgb(frame.pixels(), frame.width, frame.height)?,
    };
    Frame::new(frame.width, frame.height, PixelFormat::Rgb, data)
}

/// Convert RGB to RGBA by adding alpha=255
pub fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba() {
        let rgb = vec![255, 128, 64, 0, 0, 0];
        let rgba = rgb_to_rgba(&rgb);

        assert_eq!(rgba.len(), 8);
        assert_eq!(rgba[0..4], [255, 128, 64, 255]);
        assert_eq!(rgba[4..8], [0, 0, 0, 255]);
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let frame = Frame::new(1, 1, PixelFormat::Bgra, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(to_rgba(&frame).unwrap().pixels(), &[3, 2, 1, 4]);
        assert_eq!(to_rgb(&frame).unwrap().pixels(), &[3, 2, 1]);
    }

    #[test]
    fn test_yuyv_white_normalizes_to_white() {
        let frame = Frame::new(2, 1, PixelFormat::Yuyv, vec![235u8, 128, 235, 128]).unwrap();
        let rgba = to_rgba(&frame).unwrap();
        assert_eq!(rgba.format, PixelFormat::Rgba);
        assert!(rgba.pixels().chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn test_rgba_passthrough_shares_buffer() {
        let frame = Frame::solid_rgba(2, 2, [9, 9, 9, 9]).unwrap();
        let out = to_rgba(&frame).unwrap();
        assert!(std::sync::Arc::ptr_eq(&frame.data, &out.data));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let frame = Frame {
            width: 4,
            height: 4,
            format: PixelFormat::Yuyv,
            data: vec![0u8; 3].into(),
        };
        assert!(matches!(
            to_rgba(&frame),
            Err(ConversionError::BufferTooSmall { expected: 32, actual: 3 })
        ));
    }

    #[test]
    fn test_gray_expands() {
        let frame = Frame::new(2, 1, PixelFormat::Gray8, vec![7u8, 9]).unwrap();
        assert_eq!(to_rgb(&frame).unwrap().pixels(), &[7, 7, 7, 9, 9, 9]);
    }
}
