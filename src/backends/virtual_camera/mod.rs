// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera output through v4l2loopback
//!
//! Processed preview frames are written to a loopback node that other
//! applications (video conferencing software) open as a regular camera.
//!
//! # Architecture
//!
//! ```text
//! Processed frame (RGBA, top row first)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ Normalize + fit  │  ← RGB888, optional cover scale + centred crop
//! └──────────────────┘
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ BT.601 YUYV      │  ← media::yuyv
//! └──────────────────┘
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ DeviceSession    │  ← lazy open, VIDIOC_S_FMT, write(2)
//! └──────────────────┘
//!        │
//!        ▼
//!   /dev/videoN (v4l2loopback)
//! ```

mod session;
mod v4l2_output;

pub use session::{DeviceSession, SessionState};
pub use v4l2_output::{
    DeviceOpener, OutputDevice, V4l2DeviceOpener, V4l2LoopbackDevice, VideoNodeInfo,
    probe_video_nodes,
};

use crate::constants::DEFAULT_DEVICE_PATH;
use crate::errors::{DeviceError, StreamerError};
use crate::media::{Frame, Size, crop_to_fit, rgb_to_yuyv, to_rgb};
use tracing::{debug, info, warn};

type ErrorObserver = Box<dyn FnMut(&StreamerError)>;

/// Writes processed frames to a virtual camera device
///
/// Output is disabled by default. Every error is reported through the error
/// observer. A failed write only closes the device, so the next frame reopens
/// it; any other error also disables output until the caller re-enables it.
pub struct VirtualCameraStreamer<O: DeviceOpener = V4l2DeviceOpener> {
    session: DeviceSession<O>,
    enabled: bool,
    forced_resolution: Option<Size>,
    error_observer: Option<ErrorObserver>,
}

impl VirtualCameraStreamer<V4l2DeviceOpener> {
    /// Streamer for real v4l2loopback devices at the default path
    pub fn with_default_device() -> Self {
        Self::new(V4l2DeviceOpener)
    }
}

impl<O: DeviceOpener> VirtualCameraStreamer<O> {
    pub fn new(opener: O) -> Self {
        Self {
            session: DeviceSession::new(opener, DEFAULT_DEVICE_PATH),
            enabled: false,
            forced_resolution: None,
            error_observer: None,
        }
    }

    /// Register the error channel
    pub fn set_error_observer(&mut self, observer: impl FnMut(&StreamerError) + 'static) {
        self.error_observer = Some(Box::new(observer));
    }

    pub fn session(&self) -> &DeviceSession<O> {
        &self.session
    }

    pub fn device_path(&self) -> &str {
        self.session.device_path()
    }

    pub fn forced_resolution(&self) -> Option<Size> {
        self.forced_resolution
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Select the output node; blank paths fall back to the default node
    pub fn set_device_path(&mut self, path: &str) {
        let path = match path.trim() {
            "" => DEFAULT_DEVICE_PATH,
            trimmed => trimmed,
        };
        if path == self.session.device_path() {
            return;
        }
        info!(path, "Virtual camera device changed");
        self.session.set_device_path(path);
    }

    /// Fix the output size; frames of another size are scaled and cropped
    ///
    /// A zero dimension clears the forced size.
    pub fn set_forced_resolution(&mut self, resolution: Option<Size>) {
        let resolution = resolution.filter(|size| !size.is_empty());
        if resolution == self.forced_resolution {
            return;
        }
        self.forced_resolution = resolution;
        match resolution {
            Some(size) => info!(
                width = size.width,
                height = size.height,
                "Virtual camera resolution forced"
            ),
            None => info!("Virtual camera follows the source resolution"),
        }
        self.session.close();
    }

    /// Enable or disable output
    ///
    /// Enabling is lazy: the device opens on the next frame.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            info!(path = %self.session.device_path(), "Virtual camera output enabled");
        } else {
            info!("Virtual camera output disabled");
            self.session.close();
        }
    }

    /// Convert and write one processed frame
    ///
    /// No-op while disabled. On failure the frame is dropped.
    pub fn on_processed_frame(&mut self, frame: &Frame) {
        if !self.enabled {
            return;
        }
        if let Err(error) = self.stream_frame(frame) {
            self.fail(error);
        }
    }

    fn stream_frame(&mut self, frame: &Frame) -> Result<(), StreamerError> {
        let mut rgb = to_rgb(frame)?;
        if let Some(target) = self.forced_resolution {
            rgb = crop_to_fit(&rgb, target)?;
        }

        self.session.ensure_ready(rgb.width, rgb.height)?;
        let yuyv = rgb_to_yuyv(&rgb)?;
        self.session.write(&yuyv)?;
        Ok(())
    }

    fn fail(&mut self, error: StreamerError) {
        if let Some(observer) = self.error_observer.as_mut() {
            observer(&error);
        }
        self.session.close();

        if let StreamerError::Device(DeviceError::Write { .. }) = error {
            warn!(error = %error, "Virtual camera frame dropped, reopening on next frame");
            return;
        }
        warn!(error = %error, "Virtual camera output stopped");
        self.enabled = false;
        debug!("Virtual camera output disabled after error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConversionError;
    use crate::media::PixelFormat;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    #[derive(Default)]
    struct Written {
        opened: Vec<String>,
        formats: Vec<(u32, u32)>,
        frames: Vec<Vec<u8>>,
    }

    struct MemoryDevice(Rc<RefCell<Written>>);

    impl OutputDevice for MemoryDevice {
        fn path(&self) -> &str {
            "memory"
        }

        fn configure_format(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
            self.0.borrow_mut().formats.push((width, height));
            Ok(())
        }

        fn write_frame(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().frames.push(data.to_vec());
            Ok(data.len())
        }
    }

    fn streamer() -> (VirtualCameraStreamer<impl DeviceOpener>, Rc<RefCell<Written>>) {
        let written = Rc::new(RefCell::new(Written::default()));
        let shared = written.clone();
        let opener = move |path: &str| -> Result<Box<dyn OutputDevice>, DeviceError> {
            shared.borrow_mut().opened.push(path.to_string());
            Ok(Box::new(MemoryDevice(shared.clone())))
        };
        (VirtualCameraStreamer::new(opener), written)
    }

    #[test]
    fn test_disabled_by_default_writes_nothing() {
        let (mut streamer, written) = streamer();
        let frame = Frame::solid_rgba(4, 2, [255, 0, 0, 255]).unwrap();
        streamer.on_processed_frame(&frame);
        assert!(written.borrow().opened.is_empty());
        assert_eq!(streamer.device_path(), DEFAULT_DEVICE_PATH);
    }

    #[test]
    fn test_red_frame_reaches_device_as_yuyv() {
        let (mut streamer, written) = streamer();
        streamer.set_enabled(true);
        streamer.on_processed_frame(&Frame::solid_rgba(4, 2, [255, 0, 0, 255]).unwrap());

        let written = written.borrow();
        assert_eq!(written.opened, vec![DEFAULT_DEVICE_PATH.to_string()]);
        assert_eq!(written.formats, vec![(4, 2)]);
        assert_eq!(written.frames.len(), 1);
        assert_eq!(written.frames[0].len(), 16);
        assert_eq!(&written.frames[0][..4], &[82, 90, 82, 240]);
    }

    #[test]
    fn test_forced_resolution_crops_to_exact_size() {
        let (mut streamer, written) = streamer();
        streamer.set_enabled(true);
        streamer.set_forced_resolution(Some(Size::new(64, 48)));
        streamer.on_processed_frame(&Frame::solid_rgba(192, 108, [0, 0, 255, 255]).unwrap());

        let written = written.borrow();
        assert_eq!(written.formats, vec![(64, 48)]);
        assert_eq!(written.frames[0].len(), 64 * 48 * 2);
    }

    #[test]
    fn test_zero_resolution_clears_forced_size() {
        let (mut streamer, _) = streamer();
        streamer.set_forced_resolution(Some(Size::new(0, 480)));
        assert_eq!(streamer.forced_resolution(), None);
    }

    #[test]
    fn test_blank_path_falls_back_to_default() {
        let (mut streamer, written) = streamer();
        streamer.set_device_path("  /dev/video9 ");
        assert_eq!(streamer.device_path(), "/dev/video9");
        streamer.set_device_path("   ");
        assert_eq!(streamer.device_path(), DEFAULT_DEVICE_PATH);

        streamer.set_enabled(true);
        streamer.on_processed_frame(&Frame::solid_rgba(2, 2, [0, 0, 0, 255]).unwrap());
        assert_eq!(written.borrow().opened, vec![DEFAULT_DEVICE_PATH.to_string()]);
    }

    #[test]
    fn test_conversion_failure_disables_output() {
        let (mut streamer, written) = streamer();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        streamer.set_error_observer(move |e| sink.borrow_mut().push(e.clone()));
        streamer.set_enabled(true);

        // Header claims 4x4 RGBA but the buffer is truncated
        let bad = Frame {
            width: 4,
            height: 4,
            format: PixelFormat::Rgba,
            data: vec![0u8; 8].into(),
        };
        streamer.on_processed_frame(&bad);

        assert!(!streamer.is_enabled());
        assert!(written.borrow().frames.is_empty());
        assert!(matches!(
            errors.borrow()[0],
            StreamerError::Conversion(ConversionError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_open_failure_reports_and_disables() {
        let opener = |path: &str| -> Result<Box<dyn OutputDevice>, DeviceError> {
            Err(DeviceError::Open {
                path: path.to_string(),
                reason: "Permission denied".into(),
            })
        };
        let mut streamer = VirtualCameraStreamer::new(opener);
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        streamer.set_error_observer(move |e: &StreamerError| sink.borrow_mut().push(e.to_string()));
        streamer.set_enabled(true);

        let frame = Frame::solid_rgba(2, 2, [0, 0, 0, 255]).unwrap();
        streamer.on_processed_frame(&frame);
        streamer.on_processed_frame(&frame);

        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Cannot open virtual camera device /dev/video42"));
        assert!(!streamer.is_enabled());
    }
}
