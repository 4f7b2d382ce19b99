// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 webcam capture
//!
//! Negotiates packed YUYV at the requested size and falls back to RGB3 when
//! the driver refuses. Frames are copied out of the mmap buffers and
//! normalized to RGBA before they leave this module.

use crate::constants::capture::BUFFER_COUNT;
use crate::errors::{AppError, AppResult, ConversionError};
use crate::media::{Frame, PixelFormat, to_rgba};
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats tried in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 2] = [b"YUYV", b"RGB3"];

/// Streaming capture from a `/dev/videoN` node
pub struct V4l2Capture {
    path: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    stream: Stream<'static>,
    frames_captured: u64,
    // Keeps the handle alive for the stream's lifetime
    _device: Device,
}

impl V4l2Capture {
    /// Open `path` and start streaming at (or near) `width` x `height`
    pub fn open(path: &str, width: u32, height: u32) -> AppResult<Self> {
        let device = Device::with_path(path).map_err(|e| {
            AppError::Io(format!("Cannot open capture device {}: {}", path, e))
        })?;

        let (actual, format) = negotiate_format(&device, width, height)?;
        info!(
            path,
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc,
            "Capture format negotiated"
        );

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| AppError::Io(format!("Failed to create capture stream: {}", e)))?;

        Ok(Self {
            path: path.to_string(),
            width: actual.width,
            height: actual.height,
            format,
            stream,
            frames_captured: 0,
            _device: device,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Negotiated size (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    /// Block until the next frame arrives and return it as RGBA
    pub fn next_frame(&mut self) -> AppResult<Frame> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| AppError::Io(format!("Failed to capture frame: {}", e)))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let expected = Frame::byte_len(self.width, self.height, self.format);
        if used < expected {
            // Some drivers report 0 bytesused; fall back to the whole buffer
            debug!(used, expected, "Short capture buffer, using full mapping");
        }
        let bytes = if used >= expected { &buf[..used] } else { buf };

        let raw = Frame::new(self.width, self.height, self.format, bytes.to_vec())?;
        self.frames_captured += 1;
        Ok(to_rgba(&raw)?)
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}

/// Request YUYV, then RGB3; the driver may adjust the size
fn negotiate_format(device: &Device, width: u32, height: u32) -> AppResult<(Format, PixelFormat)> {
    for fourcc in PREFERRED_FOURCCS {
        let request = Format::new(width, height, FourCC::new(fourcc));
        match device.set_format(&request) {
            Ok(actual) => {
                if let Some(format) = PixelFormat::from_fourcc(&actual.fourcc.repr) {
                    return Ok((actual, format));
                }
                debug!(
                    requested = %FourCC::new(fourcc),
                    got = %actual.fourcc,
                    "Driver substituted an unsupported format"
                );
            }
            Err(e) => {
                warn!(fourcc = %FourCC::new(fourcc), error = %e, "Capture format rejected");
            }
        }
    }
    Err(ConversionError::UnsupportedFormat("capture device offers neither YUYV nor RGB3".into()).into())
}
