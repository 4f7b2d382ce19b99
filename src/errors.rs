// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the filter pipeline
//!
//! Every stage returns a typed error instead of panicking. None of them is
//! fatal to the process: GPU errors skip a render pass, device errors close
//! the output session, conversion errors drop the current frame.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type used by the CLI and pipeline wiring
#[derive(Debug, Clone)]
pub enum AppError {
    /// GPU setup or rendering errors
    Gpu(GpuError),
    /// Virtual camera device errors
    Device(DeviceError),
    /// Pixel format conversion errors
    Conversion(ConversionError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// GPU resource and rendering errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// No usable adapter was found
    AdapterUnavailable(String),
    /// Device/queue creation failed
    DeviceCreation(String),
    /// Shader compilation or pipeline linking failed
    ShaderCompilation(String),
    /// Texture, framebuffer or buffer allocation failed
    ResourceAllocation(String),
    /// Mapping the readback buffer failed
    Readback(String),
}

/// Virtual camera device session errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device node could not be opened
    Open { path: String, reason: String },
    /// VIDIOC_S_FMT was rejected
    Configure { width: u32, height: u32, reason: String },
    /// A write failed or was short
    Write { written: usize, expected: usize, reason: String },
    /// Operation attempted on a closed session
    Closed,
}

/// Pixel format conversion errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel buffer is shorter than the dimensions require
    BufferTooSmall { expected: usize, actual: usize },
    /// The source pixel format cannot be converted
    UnsupportedFormat(String),
    /// Resizing to the output resolution failed
    Scale(String),
}

/// Errors reported by the virtual camera streamer
///
/// A write failure only drops the frame; the others disable output until it
/// is enabled again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamerError {
    Device(DeviceError),
    Conversion(ConversionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Gpu(e) => write!(f, "GPU error: {}", e),
            AppError::Device(e) => write!(f, "Virtual camera error: {}", e),
            AppError::Conversion(e) => write!(f, "Conversion error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::AdapterUnavailable(msg) => write!(f, "No GPU adapter available: {}", msg),
            GpuError::DeviceCreation(msg) => write!(f, "Failed to create GPU device: {}", msg),
            GpuError::ShaderCompilation(msg) => write!(f, "Failed to build shader program: {}", msg),
            GpuError::ResourceAllocation(msg) => write!(f, "GPU allocation failed: {}", msg),
            GpuError::Readback(msg) => write!(f, "Pixel readback failed: {}", msg),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Open { path, reason } => {
                write!(f, "Cannot open virtual camera device {}: {}", path, reason)
            }
            DeviceError::Configure {
                width,
                height,
                reason,
            } => write!(
                f,
                "Failed to configure virtual camera format {}x{}: {}",
                width, height, reason
            ),
            DeviceError::Write {
                written,
                expected,
                reason,
            } => write!(
                f,
                "Failed to write frame to virtual camera ({} of {} bytes): {}",
                written, expected, reason
            ),
            DeviceError::Closed => write!(f, "Virtual camera device is not open"),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions {}x{}", width, height)
            }
            ConversionError::BufferTooSmall { expected, actual } => write!(
                f,
                "Frame buffer holds {} bytes, expected at least {}",
                actual, expected
            ),
            ConversionError::UnsupportedFormat(msg) => {
                write!(f, "Unsupported pixel format: {}", msg)
            }
            ConversionError::Scale(msg) => write!(f, "Failed to scale frame: {}", msg),
        }
    }
}

impl fmt::Display for StreamerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamerError::Device(e) => write!(f, "{}", e),
            StreamerError::Conversion(e) => {
                write!(f, "Failed to convert frame for virtual camera output: {}", e)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for StreamerError {}
impl std::error::Error for GpuError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for ConversionError {}

impl From<GpuError> for AppError {
    fn from(err: GpuError) -> Self {
        AppError::Gpu(err)
    }
}

impl From<DeviceError> for AppError {
    fn from(err: DeviceError) -> Self {
        AppError::Device(err)
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        AppError::Conversion(err)
    }
}

impl From<StreamerError> for AppError {
    fn from(err: StreamerError) -> Self {
        match err {
            StreamerError::Device(e) => AppError::Device(e),
            StreamerError::Conversion(e) => AppError::Conversion(e),
        }
    }
}

impl From<DeviceError> for StreamerError {
    fn from(err: DeviceError) -> Self {
        StreamerError::Device(err)
    }
}

impl From<ConversionError> for StreamerError {
    fn from(err: ConversionError) -> Self {
        StreamerError::Conversion(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
