// SPDX-License-Identifier: GPL-3.0-only

//! RGB to packed YUYV (YUY2) conversion for virtual camera output
//!
//! Uses integer BT.601 coefficients. Each horizontal pixel pair shares one
//! chroma sample: the average of the two pixels' independently rounded U and V
//! values. Output is exactly `width * height * 2` bytes, one `Y0 U Y1 V`
//! macropixel per pair.

use super::frame::{Frame, PixelFormat};
use crate::constants::bt601;
use crate::errors::ConversionError;

/// Per-pixel luma and chroma
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Yuv {
    pub y: u8,
    pub u: u8,
    pub v: u8,
}

#[inline]
fn clamp_byte(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

#[inline]
fn weighted(coeffs: [i32; 3], r: i32, g: i32, b: i32) -> i32 {
    (coeffs[0] * r + coeffs[1] * g + coeffs[2] * b + bt601::ROUNDING) >> 8
}

/// Convert one RGB pixel to YUV (BT.601, studio swing)
#[inline]
pub fn rgb_to_yuv(r: u8, g: u8, b: u8) -> Yuv {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    Yuv {
        y: clamp_byte(weighted(bt601::Y, r, g, b) + bt601::Y_OFFSET),
        u: clamp_byte(weighted(bt601::U, r, g, b) + bt601::CHROMA_OFFSET),
        v: clamp_byte(weighted(bt601::V, r, g, b) + bt601::CHROMA_OFFSET),
    }
}

/// Convert one YUV sample back to RGB (inverse integer BT.601)
#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    [
        clamp_byte((298 * c + 409 * e + 128) >> 8),
        clamp_byte((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp_byte((298 * c + 516 * d + 128) >> 8),
    ]
}

/// Pack an RGB (or RGBA, alpha ignored) frame as YUYV
///
/// Fails only on zero dimensions, a short buffer or a non-RGB input format;
/// no partial buffer is ever returned.
pub fn rgb_to_yuyv(frame: &Frame) -> Result<Vec<u8>, ConversionError> {
    let bpp = match frame.format {
        PixelFormat::Rgb => 3,
        PixelFormat::Rgba => 4,
        other => {
            return Err(ConversionError::UnsupportedFormat(format!(
                "{:?} cannot be packed as YUYV",
                other
            )));
        }
    };
    frame.validate()?;
    pack_yuyv(&frame.data, frame.width, frame.height, bpp)
}

/// Pack raw interleaved RGB pixels (`bpp` bytes each, R G B first) as YUYV
pub fn pack_yuyv(
    src: &[u8],
    width: u32,
    height: u32,
    bpp: usize,
) -> Result<Vec<u8>, ConversionError> {
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions { width, height });
    }

    let width = width as usize;
    let height = height as usize;
    let src_stride = width * bpp;
    if src.len() < src_stride * height {
        return Err(ConversionError::BufferTooSmall {
            expected: src_stride * height,
            actual: src.len(),
        });
    }

    let dst_stride = width * 2;
    let mut out = vec![0u8; dst_stride * height];

    for (src_row, dst_row) in src
        .chunks_exact(src_stride)
        .zip(out.chunks_exact_mut(dst_stride))
    {
        let pixel = |x: usize| {
            let p = &src_row[x * bpp..x * bpp + 3];
            rgb_to_yuv(p[0], p[1], p[2])
        };

        let mut x = 0;
        while x + 1 < width {
            let p0 = pixel(x);
            let p1 = pixel(x + 1);

            // Average the already rounded chroma of each pixel
            let u = clamp_byte((p0.u as i32 + p1.u as i32) / 2);
            let v = clamp_byte((p0.v as i32 + p1.v as i32) / 2);

            dst_row[x * 2..x * 2 + 4].copy_from_slice(&[p0.y, u, p1.y, v]);
            x += 2;
        }

        // Odd width: the last pixel has no partner and keeps its own chroma.
        // Only two bytes of the row remain, so it is stored as Y, U.
        if x < width {
            let p0 = pixel(x);
            dst_row[x * 2] = p0.y;
            dst_row[x * 2 + 1] = p0.u;
        }
    }

    Ok(out)
}

/// Unpack YUYV to RGB (3 bytes per pixel)
///
/// An odd trailing column reuses the U byte for V, mirroring what the packer
/// can store for a lone pixel.
pub fn yuyv_to_rgb(src: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConversionError> {
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions { width, height });
    }
    let width = width as usize;
    let height = height as usize;
    let src_stride = width * 2;
    if src.len() < src_stride * height {
        return Err(ConversionError::BufferTooSmall {
            expected: src_stride * height,
            actual: src.len(),
        });
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for row in src.chunks_exact(src_stride).take(height) {
        let mut x = 0;
        while x + 1 < width {
            let m = &row[x * 2..x * 2 + 4];
            out.extend_from_slice(&yuv_to_rgb(m[0], m[1], m[3]));
            out.extend_from_slice(&yuv_to_rgb(m[2], m[1], m[3]));
            x += 2;
        }
        if x < width {
            let (y, u) = (row[x * 2], row[x * 2 + 1]);
            out.extend_from_slice(&yuv_to_rgb(y, u, u));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_red_4x2() {
        let frame = Frame::solid_rgb(4, 2, [255, 0, 0]).unwrap();
        let yuyv = rgb_to_yuyv(&frame).unwrap();

        assert_eq!(yuyv.len(), 16);
        for macropixel in yuyv.chunks_exact(4) {
            assert_eq!(macropixel, [82, 90, 82, 240]);
        }
    }

    #[test]
    fn test_white_and_black_levels() {
        assert_eq!(rgb_to_yuv(255, 255, 255), Yuv { y: 235, u: 128, v: 128 });
        assert_eq!(rgb_to_yuv(0, 0, 0), Yuv { y: 16, u: 128, v: 128 });
    }

    #[test]
    fn test_chroma_is_average_of_rounded_values() {
        // Red and blue pixels: U = (90 + 240) / 2, V = (240 + 110) / 2
        let red = rgb_to_yuv(255, 0, 0);
        let blue = rgb_to_yuv(0, 0, 255);
        let frame = crate::media::Frame::new(
            2,
            1,
            PixelFormat::Rgb,
            vec![255u8, 0, 0, 0, 0, 255],
        )
        .unwrap();
        let yuyv = rgb_to_yuyv(&frame).unwrap();

        assert_eq!(yuyv[0], red.y);
        assert_eq!(yuyv[1], ((red.u as i32 + blue.u as i32) / 2) as u8);
        assert_eq!(yuyv[2], blue.y);
        assert_eq!(yuyv[3], ((red.v as i32 + blue.v as i32) / 2) as u8);
    }

    #[test]
    fn test_odd_width_size_and_lone_column() {
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[0, 0, 255, 0, 0, 255, 255, 0, 0]);
        }
        let frame = Frame::new(3, 2, PixelFormat::Rgb, data).unwrap();
        let yuyv = rgb_to_yuyv(&frame).unwrap();

        assert_eq!(yuyv.len(), 3 * 2 * 2);
        let red = rgb_to_yuv(255, 0, 0);
        for row in yuyv.chunks_exact(6) {
            // Last pixel is red and is not averaged with the blue pair
            assert_eq!(row[4], red.y);
            assert_eq!(row[5], red.u);
        }
    }

    #[test]
    fn test_rgba_input_ignores_alpha() {
        let rgb = Frame::solid_rgb(2, 2, [10, 200, 30]).unwrap();
        let rgba = Frame::solid_rgba(2, 2, [10, 200, 30, 7]).unwrap();
        assert_eq!(rgb_to_yuyv(&rgb).unwrap(), rgb_to_yuyv(&rgba).unwrap());
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let samples: [[u8; 3]; 6] = [
            [128, 128, 128],
            [200, 120, 60],
            [30, 90, 160],
            [250, 240, 230],
            [64, 64, 64],
            [100, 180, 120],
        ];
        for rgb in samples {
            let frame = Frame::solid_rgb(2, 1, rgb).unwrap();
            let yuyv = rgb_to_yuyv(&frame).unwrap();
            let back = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
            for (orig, got) in rgb.iter().zip(back.iter()) {
                assert!(
                    (*orig as i32 - *got as i32).abs() <= 2,
                    "rgb {:?} came back as {:?}",
                    rgb,
                    &back[..3]
                );
            }
        }
    }

    #[test]
    fn test_zero_dimensions_fail() {
        assert!(pack_yuyv(&[], 0, 1, 3).is_err());
        assert!(pack_yuyv(&[], 1, 0, 3).is_err());
    }

    #[test]
    fn test_non_rgb_input_rejected() {
        let frame = Frame::new(2, 1, PixelFormat::Gray8, vec![1u8, 2]).unwrap();
        assert!(matches!(
            rgb_to_yuyv(&frame),
            Err(ConversionError::UnsupportedFormat(_))
        ));
    }
}
