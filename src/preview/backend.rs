// SPDX-License-Identifier: GPL-3.0-only

//! Render backend abstraction
//!
//! A backend owns every GPU resource of one rendering context. The preview
//! drives it and keeps all scheduling decisions (when to upload, when to
//! emit) on its side, so each backend only has to do what it is asked.

use crate::errors::GpuError;
use crate::media::{Frame, Size};
use crate::shaders::CompositePass;

/// Resources and passes needed by [`FilterPreview`](super::FilterPreview)
pub trait RenderBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Compile and link the compositor program
    ///
    /// Called once per context. The preview stops rendering when it fails.
    fn ensure_program(&mut self) -> Result<(), GpuError>;

    /// Create the static quad, once per context
    fn ensure_geometry(&mut self) -> Result<(), GpuError>;

    /// Upload a row-flipped RGBA frame into the source texture
    ///
    /// Texture storage is recreated only when it is missing or its
    /// dimensions differ from the frame's.
    fn upload(&mut self, rgba_flipped: &Frame) -> Result<(), GpuError>;

    /// Make the offscreen target exactly `size`
    ///
    /// An empty size releases it; an equal size keeps it. On failure the
    /// target is left unset.
    fn ensure_offscreen_target(&mut self, size: Size) -> Result<(), GpuError>;

    /// Whether an offscreen target is currently allocated
    fn has_offscreen_target(&self) -> bool;

    /// Draw to the visible surface, clearing it to black first
    ///
    /// Without an uploaded texture only the clear happens.
    fn render_visible(&mut self, pass: &CompositePass, size: Size) -> Result<(), GpuError>;

    /// Draw to the offscreen target and return its tightly packed RGBA rows
    /// in storage order
    fn render_offscreen(&mut self, pass: &CompositePass) -> Result<Vec<u8>, GpuError>;

    /// Release every resource of the current context
    fn release(&mut self);
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn ensure_program(&mut self) -> Result<(), GpuError> {
        (**self).ensure_program()
    }

    fn ensure_geometry(&mut self) -> Result<(), GpuError> {
        (**self).ensure_geometry()
    }

    fn upload(&mut self, rgba_flipped: &Frame) -> Result<(), GpuError> {
        (**self).upload(rgba_flipped)
    }

    fn ensure_offscreen_target(&mut self, size: Size) -> Result<(), GpuError> {
        (**self).ensure_offscreen_target(size)
    }

    fn has_offscreen_target(&self) -> bool {
        (**self).has_offscreen_target()
    }

    fn render_visible(&mut self, pass: &CompositePass, size: Size) -> Result<(), GpuError> {
        (**self).render_visible(pass, size)
    }

    fn render_offscreen(&mut self, pass: &CompositePass) -> Result<Vec<u8>, GpuError> {
        (**self).render_offscreen(pass)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
