// SPDX-License-Identifier: GPL-3.0-only

//! Output resolution fitting for the virtual camera
//!
//! When a forced resolution is set, every frame is scaled to cover the target
//! while keeping its aspect ratio, then the overflow is cropped equally from
//! both sides so the result is exactly the requested size.

use super::frame::{Frame, PixelFormat, Size};
use crate::errors::ConversionError;
use image::{ImageBuffer, Rgb, imageops};
use tracing::debug;

/// Size of the cover-scaled image before cropping
///
/// The smaller dimension of the result equals the target's, the other one is
/// at least as large.
pub fn cover_size(source: Size, target: Size) -> Size {
    let scale_x = target.width as f64 / source.width as f64;
    let scale_y = target.height as f64 / source.height as f64;
    let scale = scale_x.max(scale_y);
    Size::new(
        ((source.width as f64 * scale).round() as u32).max(target.width),
        ((source.height as f64 * scale).round() as u32).max(target.height),
    )
}

/// Scale an RGB frame to fill `target` and crop the centred region
pub fn crop_to_fit(frame: &Frame, target: Size) -> Result<Frame, ConversionError> {
    if target.is_empty() {
        return Err(ConversionError::InvalidDimensions {
            width: target.width,
            height: target.height,
        });
    }
    if frame.format != PixelFormat::Rgb {
        return Err(ConversionError::UnsupportedFormat(format!(
            "crop_to_fit expects RGB input, got {:?}",
            frame.format
        )));
    }
    frame.validate()?;
    if frame.size() == target {
        return Ok(frame.clone());
    }

    let image: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.pixels().to_vec()).ok_or_else(
            || ConversionError::Scale("frame buffer does not match its dimensions".into()),
        )?;

    let scaled_size = cover_size(frame.size(), target);
    let scaled = imageops::resize(
        &image,
        scaled_size.width,
        scaled_size.height,
        imageops::FilterType::Lanczos3,
    );

    let x_offset = (scaled_size.width - target.width) / 2;
    let y_offset = (scaled_size.height - target.height) / 2;
    let cropped =
        imageops::crop_imm(&scaled, x_offset, y_offset, target.width, target.height).to_image();

    debug!(
        src_width = frame.width,
        src_height = frame.height,
        width = target.width,
        height = target.height,
        x_offset,
        y_offset,
        "Scaled frame to forced resolution"
    );

    Frame::new(target.width, target.height, PixelFormat::Rgb, cropped.into_raw())
}
