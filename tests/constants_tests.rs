// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use vcam_filter::constants::{DEFAULT_DEVICE_PATH, ResolutionPreset, bt601, file_formats};

#[test]
fn test_resolution_presets_ordered() {
    let mut prev = 0u32;
    for preset in ResolutionPreset::ALL {
        let (w, h) = preset.dimensions();
        assert!(w * h > prev, "Presets should be ordered smallest first");
        prev = w * h;
    }
}

#[test]
fn test_preset_names_round_trip() {
    for preset in ResolutionPreset::ALL {
        assert_eq!(ResolutionPreset::from_name(preset.display_name()), Some(preset));
    }
    assert_eq!(ResolutionPreset::from_name("1080P"), Some(ResolutionPreset::FullHd));
    assert_eq!(ResolutionPreset::from_name("4k"), None);
}

#[test]
fn test_presets_have_even_width() {
    // YUYV macropixels cover two columns
    for preset in ResolutionPreset::ALL {
        assert_eq!(preset.dimensions().0 % 2, 0);
    }
}

#[test]
fn test_bt601_luma_weights_sum() {
    // White maps to Y = 235
    let sum: i32 = bt601::Y.iter().sum();
    assert_eq!(((sum * 255 + bt601::ROUNDING) >> 8) + bt601::Y_OFFSET, 235);
}

#[test]
fn test_default_device_path() {
    assert!(DEFAULT_DEVICE_PATH.starts_with("/dev/video"));
}

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("PNG"));
    assert!(file_formats::is_image_extension("jpeg"));
    assert!(!file_formats::is_image_extension("mp4"));
}
