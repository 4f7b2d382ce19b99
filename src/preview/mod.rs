// SPDX-License-Identifier: GPL-3.0-only

//! Filter preview: frame scheduling on top of a render backend
//!
//! The preview is driven by its host through four hooks:
//!
//! - [`FilterPreview::on_context_ready`] / [`FilterPreview::on_context_lost`]
//!   bracket the lifetime of the rendering context
//! - [`FilterPreview::upload_frame`] hands over a new input frame
//! - [`FilterPreview::render`] repaints the visible surface
//!
//! Work is triggered by frame arrival only. A new frame arms two single-shot
//! state machines: the texture upload and the processed-frame emission. Extra
//! repaints reuse the uploaded texture and never emit a second time, so every
//! input frame produces exactly one processed frame.

mod backend;
pub mod software;
pub mod wgpu_backend;

pub use backend::RenderBackend;
pub use software::SoftwareBackend;
pub use wgpu_backend::WgpuBackend;

use crate::constants::virtual_camera::FRAME_LOG_INTERVAL;
use crate::errors::{ConversionError, GpuError};
use crate::filter::{FilterKind, FilterState};
use crate::media::{Frame, PixelFormat, Size, flip_rows, to_rgba};
use crate::shaders::{CompositePass, aspect_fit_scale, aspect_fit_scale_or_default};
use tracing::{debug, info, warn};

/// Texture upload state of the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    /// No frame received yet
    #[default]
    Idle,
    /// A frame is waiting to be copied into the texture
    PendingUpload,
    /// The texture holds the current frame
    Uploaded,
}

/// Processed-frame emission state of the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitState {
    /// No frame received yet
    #[default]
    Idle,
    /// The current frame has not been rendered offscreen yet
    PendingEmit,
    /// The processed frame for the current input has been delivered
    Emitted,
}

type ErrorObserver = Box<dyn FnMut(&GpuError)>;

/// Filtered preview of the latest input frame
pub struct FilterPreview<B: RenderBackend> {
    backend: B,
    filter: FilterState,
    /// Latest input frame, normalized to RGBA
    frame: Option<Frame>,
    upload_state: UploadState,
    emit_state: EmitState,
    context_ready: bool,
    /// False when the program failed to build for the current context
    program_ready: bool,
    error_observer: Option<ErrorObserver>,
    emitted_frames: u64,
}

impl<B: RenderBackend> FilterPreview<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            filter: FilterState::default(),
            frame: None,
            upload_state: UploadState::Idle,
            emit_state: EmitState::Idle,
            context_ready: false,
            program_ready: false,
            error_observer: None,
            emitted_frames: 0,
        }
    }

    /// Receive GPU setup and render failures
    ///
    /// Failures are never fatal: the affected pass is skipped.
    pub fn set_error_observer(&mut self, observer: impl FnMut(&GpuError) + 'static) {
        self.error_observer = Some(Box::new(observer));
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload_state
    }

    pub fn emit_state(&self) -> EmitState {
        self.emit_state
    }

    pub fn is_context_ready(&self) -> bool {
        self.context_ready
    }

    /// Whether the compositor program is available in the current context
    pub fn is_program_ready(&self) -> bool {
        self.program_ready
    }

    /// Latest input frame (RGBA)
    pub fn current_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Number of processed frames delivered so far
    pub fn emitted_frames(&self) -> u64 {
        self.emitted_frames
    }

    /// The rendering context was created
    ///
    /// Builds the program and the quad. A program failure disables rendering
    /// until the next context.
    pub fn on_context_ready(&mut self) {
        if self.context_ready {
            return;
        }
        self.context_ready = true;
        self.program_ready = false;

        if let Err(e) = self.backend.ensure_program() {
            self.report_error(e);
            return;
        }
        if let Err(e) = self.backend.ensure_geometry() {
            self.report_error(e);
            return;
        }
        self.program_ready = true;

        // A new context starts without a texture
        if self.frame.is_some() {
            self.upload_state = UploadState::PendingUpload;
        }

        info!(backend = self.backend.name(), "Filter preview context ready");
    }

    /// The rendering context is going away; release all of its resources
    pub fn on_context_lost(&mut self) {
        if !self.context_ready {
            return;
        }
        self.backend.release();
        self.context_ready = false;
        self.program_ready = false;
        if self.upload_state == UploadState::Uploaded {
            self.upload_state = UploadState::PendingUpload;
        }
        info!(backend = self.backend.name(), "Filter preview context released");
    }

    /// Accept a new input frame
    ///
    /// Frames that cannot be normalized to RGBA are dropped and leave the
    /// preview unchanged.
    pub fn upload_frame(&mut self, frame: &Frame) -> Result<(), ConversionError> {
        let rgba = match to_rgba(frame) {
            Ok(rgba) => rgba,
            Err(e) => {
                warn!(
                    format = ?frame.format,
                    width = frame.width,
                    height = frame.height,
                    error = %e,
                    "Dropping frame that cannot be converted to RGBA"
                );
                return Err(e);
            }
        };

        self.frame = Some(rgba);
        self.upload_state = UploadState::PendingUpload;
        self.emit_state = EmitState::PendingEmit;
        Ok(())
    }

    /// Replace the filter selection (no-op when unchanged)
    pub fn set_filter(&mut self, filter: FilterState) {
        if self.filter == filter {
            return;
        }
        debug!(
            filter = %filter.kind(),
            strength = filter.strength(),
            "Filter changed"
        );
        self.filter = filter;
    }

    pub fn set_filter_kind(&mut self, kind: FilterKind) {
        let mut filter = self.filter;
        filter.set_kind(kind);
        self.set_filter(filter);
    }

    /// Set the blend strength, clamped to `[0, 1]`
    pub fn set_strength(&mut self, strength: f32) {
        let mut filter = self.filter;
        filter.set_strength(strength);
        self.set_filter(filter);
    }

    /// Repaint the visible surface at `size`
    ///
    /// Returns the processed frame when the current input frame has not been
    /// emitted yet. The processed frame has the input's dimensions, not the
    /// surface's.
    pub fn render(&mut self, size: Size) -> Option<Frame> {
        if !self.context_ready || !self.program_ready {
            return None;
        }

        self.upload_if_pending();

        let frame_size = self.frame.as_ref().map(Frame::size);
        let pass = CompositePass {
            scale: aspect_fit_scale_or_default(frame_size, size),
            filter: self.filter,
            flip_y: false,
        };
        if !size.is_empty()
            && let Err(e) = self.backend.render_visible(&pass, size)
        {
            self.report_error(e);
        }

        if self.upload_state == UploadState::Uploaded {
            self.capture_processed_frame()
        } else {
            None
        }
    }

    fn upload_if_pending(&mut self) {
        if self.upload_state != UploadState::PendingUpload {
            return;
        }
        let Some(frame) = self.frame.as_ref() else {
            return;
        };
        let flipped = frame.flipped_vertical();
        match self.backend.upload(&flipped) {
            Ok(()) => self.upload_state = UploadState::Uploaded,
            Err(e) => self.report_error(e),
        }
    }

    /// Render the current frame offscreen at its native size and read it back
    ///
    /// Runs once per input frame; later calls return `None` until a new frame
    /// arrives.
    fn capture_processed_frame(&mut self) -> Option<Frame> {
        if self.emit_state != EmitState::PendingEmit {
            return None;
        }
        let size = self.frame.as_ref()?.size();

        if let Err(e) = self.backend.ensure_offscreen_target(size) {
            self.report_error(e);
            return None;
        }
        if !self.backend.has_offscreen_target() {
            return None;
        }

        // The offscreen target is stored bottom-up and flipped after readback
        let pass = CompositePass {
            scale: aspect_fit_scale(size, size),
            filter: self.filter,
            flip_y: true,
        };
        let pixels = match self.backend.render_offscreen(&pass) {
            Ok(pixels) => pixels,
            Err(e) => {
                self.report_error(e);
                return None;
            }
        };

        let row_bytes = size.width as usize * PixelFormat::Rgba.bytes_per_pixel();
        let processed = match Frame::new(
            size.width,
            size.height,
            PixelFormat::Rgba,
            flip_rows(&pixels, row_bytes),
        ) {
            Ok(frame) => frame,
            Err(e) => {
                self.report_error(GpuError::Readback(e.to_string()));
                return None;
            }
        };

        self.emit_state = EmitState::Emitted;
        self.emitted_frames += 1;
        if self.emitted_frames % FRAME_LOG_INTERVAL == 0 {
            debug!(
                frames = self.emitted_frames,
                width = size.width,
                height = size.height,
                "Processed frames emitted"
            );
        }
        Some(processed)
    }

    fn report_error(&mut self, error: GpuError) {
        warn!(backend = self.backend.name(), error = %error, "Filter preview pass skipped");
        if let Some(observer) = self.error_observer.as_mut() {
            observer(&error);
        }
    }
}

impl<B: RenderBackend> Drop for FilterPreview<B> {
    fn drop(&mut self) {
        if self.context_ready {
            self.backend.release();
        }
    }
}
