// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU resource helpers
//!
//! - Dimension caching so textures are only reallocated on size change
//! - Row padding math for texture to buffer copies
//! - Async buffer readback

use crate::errors::GpuError;
use crate::gpu::wgpu;

/// Size a source texture was allocated with
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when a `width` x `height` upload needs new texture storage
    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }
}

/// Bytes per row of a texture copy, rounded up to wgpu's copy alignment
#[inline]
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the per-row padding of a texture readback
pub fn strip_row_padding(padded: &[u8], row_bytes: usize, padded_row_bytes: usize, rows: usize) -> Vec<u8> {
    if row_bytes == padded_row_bytes {
        return padded[..row_bytes * rows].to_vec();
    }
    let mut out = Vec::with_capacity(row_bytes * rows);
    for row in padded.chunks(padded_row_bytes).take(rows) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    out
}

/// Helper for async buffer readback (map, poll, read, unmap)
///
/// # Arguments
/// * `device` - The wgpu device for polling
/// * `buffer` - The buffer to read from (must be MAP_READ)
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, GpuError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| GpuError::Readback(format!("Device poll failed: {}", e)))?;

    receiver
        .await
        .map_err(|_| GpuError::Readback("Failed to receive buffer mapping".to_string()))?
        .map_err(|e| GpuError::Readback(format!("Failed to map buffer: {}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_dims_change_on_either_axis() {
        let dims = CachedDimensions::new(640, 480);
        assert!(!dims.needs_update(640, 480));
        assert!(dims.needs_update(640, 360));
        assert!(dims.needs_update(1280, 480));
    }

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(1, 4), 256);
        assert_eq!(padded_bytes_per_row(1280, 4), 5120);
    }

    #[test]
    fn test_strip_row_padding() {
        let padded = [1u8, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(strip_row_padding(&padded, 2, 4, 2), vec![1, 2, 3, 4]);
        assert_eq!(strip_row_padding(&[5u8, 6], 2, 2, 1), vec![5, 6]);
    }
}
