// SPDX-License-Identifier: GPL-3.0-only

//! Frame types and CPU pixel processing
//!
//! # Modules
//!
//! - [`frame`]: the immutable [`Frame`] passed between stages
//! - [`convert`]: normalization of capture formats to RGBA/RGB
//! - [`yuyv`]: BT.601 RGB to packed YUYV for the virtual camera
//! - [`scale`]: crop-to-fit scaling for a forced output resolution

pub mod convert;
pub mod frame;
pub mod scale;
pub mod yuyv;

// Re-export commonly used types
pub use convert::{to_rgb, to_rgba};
pub use frame::{Frame, PixelFormat, Size, flip_rows};
pub use scale::crop_to_fit;
pub use yuyv::rgb_to_yuyv;
