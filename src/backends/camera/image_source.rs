// SPDX-License-Identifier: GPL-3.0-only

//! Still image input

use crate::constants::file_formats;
use crate::errors::{AppError, AppResult};
use crate::media::{Frame, PixelFormat};
use std::path::Path;
use tracing::info;

/// Decode an image file into an RGBA frame
pub fn load_image_as_frame(path: &Path) -> AppResult<Frame> {
    info!(path = %path.display(), "Loading image file");

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(AppError::Other(format!(
            "Unsupported image file '{}'",
            path.display()
        )));
    }

    let img = image::open(path).map_err(|e| {
        AppError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let frame = Frame::new(width, height, PixelFormat::Rgba, rgba.into_raw())?;

    info!(width, height, "Image loaded successfully");
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_loads_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.format, PixelFormat::Rgba);
        assert_eq!(&frame.pixels()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = load_image_as_frame(Path::new("clip.mp4")).unwrap_err();
        assert!(err.to_string().contains("clip.mp4"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_image_as_frame(Path::new("/nonexistent/input.png")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.png"));
    }
}
