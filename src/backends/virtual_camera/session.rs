// SPDX-License-Identifier: GPL-3.0-only

//! Device session: lazy open, format negotiation and frame writes
//!
//! ```text
//! Closed ──ensure_ready──▶ Opening ──▶ Configured ──write──▶ Writing
//!   ▲                         │             ▲                  │
//!   │        open/configure   │             └──── full write ──┘
//!   └──────── failure ────────┴──────── short write / error ───┘
//! ```
//!
//! Any failure drops the handle, so the next frame starts from a clean open
//! and reconfigure instead of reusing a dead descriptor.

use super::v4l2_output::{DeviceOpener, OutputDevice};
use crate::constants::virtual_camera::FRAME_LOG_INTERVAL;
use crate::errors::DeviceError;
use tracing::{debug, info, warn};

/// Lifecycle of the output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No handle
    #[default]
    Closed,
    /// Handle being acquired
    Opening,
    /// Open with a negotiated format
    Configured,
    /// A frame write is in progress
    Writing,
}

/// Owner of the output device handle
pub struct DeviceSession<O: DeviceOpener> {
    opener: O,
    device: Option<Box<dyn OutputDevice>>,
    device_path: String,
    /// Dimensions of the last successful format negotiation
    configured: Option<(u32, u32)>,
    state: SessionState,
    frames_written: u64,
}

impl<O: DeviceOpener> DeviceSession<O> {
    /// Create a closed session; nothing is opened until the first frame
    pub fn new(opener: O, device_path: impl Into<String>) -> Self {
        Self {
            opener,
            device: None,
            device_path: device_path.into(),
            configured: None,
            state: SessionState::Closed,
            frames_written: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Switch to another device node, closing the current one
    pub fn set_device_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if path == self.device_path {
            return;
        }
        self.close();
        self.device_path = path;
    }

    pub fn configured_size(&self) -> Option<(u32, u32)> {
        self.configured
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Make the device ready to accept a `width` x `height` frame
    ///
    /// Opens lazily and negotiates the format when it was never configured or
    /// the size changed. A size change on an open device reopens it first,
    /// since v4l2loopback refuses a new format while the old one is in use.
    pub fn ensure_ready(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        if self.device.is_some()
            && let Some((w, h)) = self.configured
            && (w, h) != (width, height)
        {
            info!(
                old_width = w,
                old_height = h,
                width,
                height,
                "Output size changed, reopening virtual camera device"
            );
            self.close();
        }

        if self.device.is_none() {
            self.state = SessionState::Opening;
            match self.opener.open(&self.device_path) {
                Ok(device) => {
                    self.device = Some(device);
                    self.configured = None;
                }
                Err(e) => {
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            }
        }

        if self.configured != Some((width, height)) {
            let result = match self.device.as_mut() {
                Some(device) => device.configure_format(width, height),
                None => Err(DeviceError::Closed),
            };
            if let Err(e) = result {
                self.close();
                return Err(e);
            }
            self.configured = Some((width, height));
            info!(
                path = %self.device_path,
                width,
                height,
                "Virtual camera format configured"
            );
        }

        self.state = SessionState::Configured;
        Ok(())
    }

    /// Write one packed frame
    ///
    /// A short or failed write closes the session; the frame is dropped and
    /// the next frame reopens the device.
    pub fn write(&mut self, buffer: &[u8]) -> Result<(), DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Err(DeviceError::Closed);
        };
        self.state = SessionState::Writing;

        let expected = buffer.len();
        let error = match device.write_frame(buffer) {
            Ok(written) if written == expected => None,
            Ok(written) => Some(DeviceError::Write {
                written,
                expected,
                reason: "short write".to_string(),
            }),
            Err(e) => Some(DeviceError::Write {
                written: 0,
                expected,
                reason: e.to_string(),
            }),
        };

        if let Some(e) = error {
            warn!(path = %self.device_path, error = %e, "Virtual camera write failed");
            self.close();
            return Err(e);
        }

        self.state = SessionState::Configured;
        self.frames_written += 1;
        if self.frames_written % FRAME_LOG_INTERVAL == 0 {
            debug!(
                frames = self.frames_written,
                bytes = expected,
                "Virtual camera frames written"
            );
        }
        Ok(())
    }

    /// Release the device handle
    pub fn close(&mut self) {
        if self.device.take().is_some() {
            debug!(path = %self.device_path, "Virtual camera session closed");
        }
        self.configured = None;
        self.state = SessionState::Closed;
    }
}
