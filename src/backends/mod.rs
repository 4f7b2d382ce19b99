// SPDX-License-Identifier: GPL-3.0-only

//! Hardware access: frame inputs and the virtual camera output
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Pipeline                     │
//! └──────────┬─────────────────────┬────────────┘
//!            │                     │
//! ┌──────────┴─────────┐ ┌─────────┴──────────┐
//! │      Camera        │ │   Virtual Camera   │
//! │ (V4L2, still image)│ │  (v4l2loopback)    │
//! └────────────────────┘ └────────────────────┘
//! ```
//!
//! - [`camera`]: frame sources
//! - [`virtual_camera`]: YUYV output device session

pub mod camera;
pub mod virtual_camera;
