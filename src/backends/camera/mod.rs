// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources feeding the filter pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ Still image  │   │ V4L2 capture │  ← YUYV (or RGB3) mmap stream
//! └──────┬───────┘   └──────┬───────┘
//!        └─────────┬────────┘
//!                  ▼
//!            Frame (RGBA)
//! ```
//!
//! Both sources hand out RGBA frames, top row first.

mod image_source;
mod v4l2_capture;

pub use image_source::load_image_as_frame;
pub use v4l2_capture::V4l2Capture;

use std::path::Path;

/// Where the pipeline takes its frames from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A still image, repeated on every tick
    Image(String),
    /// A V4L2 capture node
    Device(String),
}

impl InputSource {
    /// Classify an `--input` argument
    ///
    /// `/dev/...` paths are capture devices, anything else is an image file.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if Path::new(input).starts_with("/dev") {
            InputSource::Device(input.to_string())
        } else {
            InputSource::Image(input.to_string())
        }
    }
}
