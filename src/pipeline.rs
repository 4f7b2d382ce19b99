// SPDX-License-Identifier: GPL-3.0-only

//! Headless wiring of the filter preview and the virtual camera
//!
//! ```text
//! input frame ──▶ FilterPreview ──processed frame──▶ VirtualCameraStreamer
//!                      │
//!                      └──▶ visible surface (optional)
//! ```

use crate::backends::virtual_camera::{DeviceOpener, VirtualCameraStreamer};
use crate::errors::ConversionError;
use crate::media::{Frame, Size};
use crate::preview::{FilterPreview, RenderBackend};

/// Preview plus streamer, driven one input frame at a time
pub struct FilterPipeline<B: RenderBackend, O: DeviceOpener> {
    preview: FilterPreview<B>,
    streamer: VirtualCameraStreamer<O>,
    surface_size: Size,
    frames_forwarded: u64,
}

impl<B: RenderBackend, O: DeviceOpener> FilterPipeline<B, O> {
    /// Wire `backend` to `streamer` and bring the rendering context up
    ///
    /// `surface_size` is the visible target; an empty size renders offscreen
    /// only.
    pub fn new(backend: B, streamer: VirtualCameraStreamer<O>, surface_size: Size) -> Self {
        let mut preview = FilterPreview::new(backend);
        preview.on_context_ready();
        Self {
            preview,
            streamer,
            surface_size,
            frames_forwarded: 0,
        }
    }

    pub fn preview(&self) -> &FilterPreview<B> {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut FilterPreview<B> {
        &mut self.preview
    }

    pub fn streamer(&self) -> &VirtualCameraStreamer<O> {
        &self.streamer
    }

    pub fn streamer_mut(&mut self) -> &mut VirtualCameraStreamer<O> {
        &mut self.streamer
    }

    /// Processed frames handed to the streamer so far
    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded
    }

    /// Feed one input frame and forward its processed counterpart
    ///
    /// Returns the processed frame, or `None` when rendering was skipped.
    pub fn push_frame(&mut self, frame: &Frame) -> Result<Option<Frame>, ConversionError> {
        self.preview.upload_frame(frame)?;
        Ok(self.repaint())
    }

    /// Repaint without new input; forwards only a not-yet-emitted frame
    pub fn repaint(&mut self) -> Option<Frame> {
        let processed = self.preview.render(self.surface_size)?;
        self.streamer.on_processed_frame(&processed);
        self.frames_forwarded += 1;
        Some(processed)
    }
}
