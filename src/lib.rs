// SPDX-License-Identifier: GPL-3.0-only

//! vcam-filter - colour filters for a webcam, republished as a virtual camera
//!
//! Frames from a camera (or a still image) are composited through a colour
//! filter on the GPU, read back, converted to YUYV and written to a
//! v4l2loopback node that conferencing applications open like any webcam.
//!
//! # Architecture
//!
//! - [`preview`]: frame scheduling on top of a [`preview::RenderBackend`]
//!   (wgpu, or the CPU fallback)
//! - [`shaders`]: the filter composite shader and its uniforms
//! - [`media`]: frame types, pixel conversions, YUYV packing and scaling
//! - [`backends`]: capture inputs and the virtual camera output
//! - [`pipeline`]: headless wiring of preview and output
//! - [`config`]: startup configuration

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filter;
pub mod gpu;
pub mod media;
pub mod pipeline;
pub mod preview;
pub mod shaders;

// Re-export commonly used types
pub use config::{Config, Resolution};
pub use errors::{AppError, AppResult};
pub use filter::{FilterKind, FilterState};
pub use pipeline::FilterPipeline;
