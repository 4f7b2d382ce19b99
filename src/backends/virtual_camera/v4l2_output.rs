// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 loopback output device
//!
//! Frames are pushed with plain `write(2)` calls after a single
//! `VIDIOC_S_FMT` negotiation. No buffers are queued, which is what
//! v4l2loopback expects from a writer.

use crate::constants::virtual_camera::YUYV_BYTES_PER_PIXEL;
use crate::errors::DeviceError;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use tracing::{debug, info};

/// Handle to an opened output device
///
/// Dropping the handle closes the device.
pub trait OutputDevice {
    /// Device node this handle was opened from
    fn path(&self) -> &str;

    /// Negotiate a packed YUYV output format of the given size
    fn configure_format(&mut self, width: u32, height: u32) -> Result<(), DeviceError>;

    /// One blocking write; returns the number of bytes accepted
    fn write_frame(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Opens output devices by path
pub trait DeviceOpener {
    fn open(&mut self, path: &str) -> Result<Box<dyn OutputDevice>, DeviceError>;
}

impl<F> DeviceOpener for F
where
    F: FnMut(&str) -> Result<Box<dyn OutputDevice>, DeviceError>,
{
    fn open(&mut self, path: &str) -> Result<Box<dyn OutputDevice>, DeviceError> {
        self(path)
    }
}

/// VIDIOC_S_FMT ioctl number: _IOWR('V', 5, struct v4l2_format)
#[cfg(target_pointer_width = "64")]
const VIDIOC_S_FMT: libc::c_ulong = 0xc0d05605;
#[cfg(target_pointer_width = "32")]
const VIDIOC_S_FMT: libc::c_ulong = 0xc0cc5605;

const V4L2_BUF_TYPE_VIDEO_OUTPUT: u32 = 2;
const V4L2_FIELD_NONE: u32 = 1;
const V4L2_COLORSPACE_SRGB: u32 = 8;

/// `struct v4l2_pix_format`
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct V4l2PixFormat {
    width: u32,
    height: u32,
    pixelformat: u32,
    field: u32,
    bytesperline: u32,
    sizeimage: u32,
    colorspace: u32,
    priv_: u32,
    flags: u32,
    ycbcr_enc: u32,
    quantization: u32,
    xfer_func: u32,
}

/// `fmt` union of `struct v4l2_format`; 200 bytes, pointer aligned
#[repr(C)]
#[allow(dead_code)]
union V4l2FormatUnion {
    pix: V4l2PixFormat,
    raw_data: [u8; 200],
    _align: [libc::c_ulong; 200 / std::mem::size_of::<libc::c_ulong>()],
}

/// `struct v4l2_format`
#[repr(C)]
struct V4l2Format {
    type_: u32,
    fmt: V4l2FormatUnion,
}

// The ioctl number encodes the struct size
const _: () = assert!(
    std::mem::size_of::<V4l2Format>() == ((VIDIOC_S_FMT >> 16) & 0x3fff) as usize
);

fn yuyv_fourcc() -> u32 {
    u32::from_le_bytes(v4l::FourCC::new(b"YUYV").repr)
}

/// Fill the output format request for a packed YUYV frame
fn output_format(width: u32, height: u32) -> V4l2Format {
    let bytesperline = width * YUYV_BYTES_PER_PIXEL;
    V4l2Format {
        type_: V4L2_BUF_TYPE_VIDEO_OUTPUT,
        fmt: V4l2FormatUnion {
            pix: V4l2PixFormat {
                width,
                height,
                pixelformat: yuyv_fourcc(),
                field: V4L2_FIELD_NONE,
                bytesperline,
                sizeimage: bytesperline * height,
                colorspace: V4L2_COLORSPACE_SRGB,
                ..Default::default()
            },
        },
    }
}

/// v4l2loopback output node opened write-only
pub struct V4l2LoopbackDevice {
    file: File,
    path: String,
}

impl V4l2LoopbackDevice {
    pub fn open(path: &str) -> Result<Self, DeviceError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| DeviceError::Open {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        info!(path, "Opened virtual camera device");
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }
}

impl OutputDevice for V4l2LoopbackDevice {
    fn path(&self) -> &str {
        &self.path
    }

    fn configure_format(&mut self, width: u32, height: u32) -> Result<(), DeviceError> {
        let mut format = output_format(width, height);
        let result = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                VIDIOC_S_FMT as _,
                &mut format as *mut V4l2Format,
            )
        };
        if result < 0 {
            return Err(DeviceError::Configure {
                width,
                height,
                reason: io::Error::last_os_error().to_string(),
            });
        }

        // The driver may adjust the request; log what it settled on
        let pix = unsafe { format.fmt.pix };
        debug!(
            path = %self.path,
            width = pix.width,
            height = pix.height,
            bytesperline = pix.bytesperline,
            sizeimage = pix.sizeimage,
            "Configured YUYV output format"
        );
        Ok(())
    }

    fn write_frame(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }
}

impl Drop for V4l2LoopbackDevice {
    fn drop(&mut self) {
        debug!(path = %self.path, "Closing virtual camera device");
    }
}

/// Opens real v4l2loopback devices
#[derive(Debug, Default, Clone, Copy)]
pub struct V4l2DeviceOpener;

impl DeviceOpener for V4l2DeviceOpener {
    fn open(&mut self, path: &str) -> Result<Box<dyn OutputDevice>, DeviceError> {
        Ok(Box::new(V4l2LoopbackDevice::open(path)?))
    }
}

/// A `/dev/video*` node and what it can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoNodeInfo {
    pub path: String,
    pub card: String,
    pub driver: String,
    pub capture: bool,
    pub output: bool,
}

impl VideoNodeInfo {
    /// v4l2loopback nodes report themselves as output devices
    pub fn is_loopback(&self) -> bool {
        self.driver == "v4l2 loopback" || self.driver.contains("loopback")
    }
}

/// List `/dev/video*` nodes with their capabilities, sorted by path
pub fn probe_video_nodes() -> Vec<VideoNodeInfo> {
    let mut nodes = Vec::new();

    let entries = match std::fs::read_dir("/dev") {
        Ok(entries) => entries,
        Err(_) => return nodes,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if !name_str.starts_with("video") {
            continue;
        }
        let path = format!("/dev/{}", name_str);

        let caps = match v4l::Device::with_path(&path).and_then(|dev| dev.query_caps()) {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping video node");
                continue;
            }
        };

        nodes.push(VideoNodeInfo {
            path,
            card: caps.card.clone(),
            driver: caps.driver.clone(),
            capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            output: caps.capabilities.contains(v4l::capability::Flags::VIDEO_OUTPUT),
        });
    }

    nodes.sort_by(|a, b| a.path.cmp(&b.path));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_request_fields() {
        let format = output_format(641, 480);
        assert_eq!(format.type_, V4L2_BUF_TYPE_VIDEO_OUTPUT);
        let pix = unsafe { format.fmt.pix };
        assert_eq!(pix.pixelformat, u32::from_le_bytes(*b"YUYV"));
        assert_eq!(pix.field, V4L2_FIELD_NONE);
        assert_eq!(pix.colorspace, V4L2_COLORSPACE_SRGB);
        assert_eq!(pix.bytesperline, 1282);
        assert_eq!(pix.sizeimage, 1282 * 480);
    }

    #[test]
    fn test_open_missing_device_names_path() {
        let err = V4l2LoopbackDevice::open("/nonexistent/video99")
            .err()
            .unwrap();
        match err {
            DeviceError::Open { path, .. } => assert_eq!(path, "/nonexistent/video99"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_configure_fails_on_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let mut device = V4l2LoopbackDevice::open(&path).unwrap();
        assert!(matches!(
            device.configure_format(64, 48),
            Err(DeviceError::Configure { width: 64, height: 48, .. })
        ));
        assert_eq!(device.write_frame(&[1, 2, 3, 4]).unwrap(), 4);
    }
}
