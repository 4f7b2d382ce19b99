// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Default v4l2loopback output node
pub const DEFAULT_DEVICE_PATH: &str = "/dev/video42";

/// Frame aspect used for the compositor before any frame has arrived
pub const DEFAULT_FRAME_ASPECT: (f32, f32) = (16.0, 9.0);

/// Common output resolutions offered for the forced-resolution option
///
/// Conferencing apps tend to dislike format changes at runtime, so pinning the
/// virtual camera to one of these keeps the output stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionPreset {
    /// 640x480
    Vga,
    /// 1280x720 (default)
    #[default]
    Hd,
    /// 1920x1080
    FullHd,
}

impl ResolutionPreset {
    /// All presets, smallest first
    pub const ALL: [ResolutionPreset; 3] = [
        ResolutionPreset::Vga,
        ResolutionPreset::Hd,
        ResolutionPreset::FullHd,
    ];

    /// Output dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionPreset::Vga => (640, 480),
            ResolutionPreset::Hd => (1280, 720),
            ResolutionPreset::FullHd => (1920, 1080),
        }
    }

    /// Short name accepted on the command line
    pub fn display_name(&self) -> &'static str {
        match self {
            ResolutionPreset::Vga => "480p",
            ResolutionPreset::Hd => "720p",
            ResolutionPreset::FullHd => "1080p",
        }
    }

    /// Parse a preset from its short name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

/// BT.601 integer coefficients used by the YUYV packer
pub mod bt601 {
    /// Y = ((66R + 129G + 25B + 128) >> 8) + 16
    pub const Y: [i32; 3] = [66, 129, 25];
    /// U = ((-38R - 74G + 112B + 128) >> 8) + 128
    pub const U: [i32; 3] = [-38, -74, 112];
    /// V = ((112R - 94G - 18B + 128) >> 8) + 128
    pub const V: [i32; 3] = [112, -94, -18];
    /// Rounding bias added before the shift
    pub const ROUNDING: i32 = 128;
    pub const Y_OFFSET: i32 = 16;
    pub const CHROMA_OFFSET: i32 = 128;
}

/// Colour filter constants shared by the WGSL shader and the CPU reference
pub mod filter {
    /// Rec.601 luma weights
    pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

    /// Sepia matrix rows (output r, g, b)
    pub const SEPIA: [[f32; 3]; 3] = [
        [0.393, 0.769, 0.189],
        [0.349, 0.686, 0.168],
        [0.272, 0.534, 0.131],
    ];

    /// Offset added by the warm filter
    pub const WARM_SHIFT: [f32; 3] = [0.05, 0.03, -0.02];

    /// Offset added by the cool filter
    pub const COOL_SHIFT: [f32; 3] = [-0.02, 0.03, 0.05];
}

/// Virtual camera output settings
pub mod virtual_camera {
    /// Log a frame counter every N frames written
    pub const FRAME_LOG_INTERVAL: u64 = 100;

    /// Bytes per pixel of packed YUYV output
    pub const YUYV_BYTES_PER_PIXEL: u32 = 2;
}

/// Capture source defaults
pub mod capture {
    use std::time::Duration;

    /// Number of mmap buffers requested from the capture driver
    pub const BUFFER_COUNT: u32 = 4;

    /// Default capture resolution
    pub const DEFAULT_RESOLUTION: (u32, u32) = (1280, 720);

    /// Pacing of a still image input (about 30 fps)
    pub const IMAGE_FRAME_INTERVAL: Duration = Duration::from_millis(33);
}

/// Supported still image file extensions for the image source
pub mod file_formats {
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "gif"];

    /// Check if extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
    }
}
