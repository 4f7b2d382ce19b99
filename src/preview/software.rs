// SPDX-License-Identifier: GPL-3.0-only

//! CPU render backend (fallback when no GPU adapter is available)
//!
//! Rasterizes the same quad as the WGSL program with nearest sampling and
//! applies [`FilterState::apply_rgba`], so its output matches the GPU path
//! at native size.

use super::RenderBackend;
use crate::errors::GpuError;
use crate::filter::FilterState;
use crate::media::{Frame, PixelFormat, Size};
use crate::shaders::{CachedDimensions, CompositePass};
use tracing::debug;

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Allocation and upload counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackendStats {
    /// Frames copied into the source texture
    pub uploads: u64,
    /// Times the source texture storage was (re)created
    pub texture_allocations: u64,
    /// Times the offscreen target was (re)created
    pub offscreen_allocations: u64,
    pub visible_renders: u64,
    pub offscreen_renders: u64,
}

struct SoftTexture {
    dims: CachedDimensions,
    rgba: Vec<u8>,
}

struct SoftTarget {
    size: Size,
    rgba: Vec<u8>,
}

impl SoftTarget {
    fn new(size: Size) -> Self {
        let rgba = CLEAR_COLOR
            .iter()
            .copied()
            .cycle()
            .take(Frame::byte_len(size.width, size.height, PixelFormat::Rgba))
            .collect();
        Self { size, rgba }
    }
}

/// Software implementation of [`RenderBackend`]
#[derive(Default)]
pub struct SoftwareBackend {
    program: bool,
    geometry: bool,
    texture: Option<SoftTexture>,
    offscreen: Option<SoftTarget>,
    surface: Option<SoftTarget>,
    stats: BackendStats,
    #[cfg(test)]
    fail_program: bool,
    #[cfg(test)]
    fail_offscreen_allocation: bool,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Last visible surface contents (RGBA, top row first)
    pub fn surface(&self) -> Option<(Size, &[u8])> {
        self.surface
            .as_ref()
            .map(|target| (target.size, target.rgba.as_slice()))
    }

    #[cfg(test)]
    pub(crate) fn fail_next_program_build(&mut self) {
        self.fail_program = true;
    }

    #[cfg(test)]
    pub(crate) fn fail_next_offscreen_allocation(&mut self) {
        self.fail_offscreen_allocation = true;
    }

    fn draw(&self, target: &mut SoftTarget, pass: &CompositePass) {
        for px in target.rgba.chunks_exact_mut(4) {
            px.copy_from_slice(&CLEAR_COLOR);
        }
        let (Some(texture), true) = (self.texture.as_ref(), self.program && self.geometry) else {
            return;
        };
        composite(target, texture, pass.uniforms().scale, pass.filter);
    }
}

/// Rasterize the scaled quad into `target`
///
/// Mirrors the vertex stage (position divided by scale) and the fragment
/// stage (flipped `v`, filter, strength blend).
fn composite(target: &mut SoftTarget, texture: &SoftTexture, scale: [f32; 2], filter: FilterState) {
    let (tw, th) = (target.size.width as usize, target.size.height as usize);
    let (sw, sh) = (texture.dims.width as usize, texture.dims.height as usize);

    for y in 0..th {
        // Row 0 is the top of the target (ndc y = +1)
        let ndc_y = 1.0 - (y as f32 + 0.5) / th as f32 * 2.0;
        let quad_y = ndc_y * scale[1];
        if !(-1.0..=1.0).contains(&quad_y) {
            continue;
        }
        // Vertex v is 1 at the bottom, the fragment stage samples 1 - v
        let sample_v = (1.0 + quad_y) / 2.0;
        let src_row = ((sample_v * sh as f32) as usize).min(sh - 1);

        for x in 0..tw {
            let ndc_x = (x as f32 + 0.5) / tw as f32 * 2.0 - 1.0;
            let quad_x = ndc_x * scale[0];
            if !(-1.0..=1.0).contains(&quad_x) {
                continue;
            }
            let u = (quad_x + 1.0) / 2.0;
            let src_col = ((u * sw as f32) as usize).min(sw - 1);

            let src = (src_row * sw + src_col) * 4;
            let px = [
                texture.rgba[src],
                texture.rgba[src + 1],
                texture.rgba[src + 2],
                texture.rgba[src + 3],
            ];
            let dst = (y * tw + x) * 4;
            target.rgba[dst..dst + 4].copy_from_slice(&filter.apply_rgba(px));
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn ensure_program(&mut self) -> Result<(), GpuError> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_program) {
            return Err(GpuError::ShaderCompilation(
                "simulated program build failure".into(),
            ));
        }
        self.program = true;
        Ok(())
    }

    fn ensure_geometry(&mut self) -> Result<(), GpuError> {
        self.geometry = true;
        Ok(())
    }

    fn upload(&mut self, rgba_flipped: &Frame) -> Result<(), GpuError> {
        if rgba_flipped.format != PixelFormat::Rgba {
            return Err(GpuError::ResourceAllocation(format!(
                "texture upload expects RGBA, got {:?}",
                rgba_flipped.format
            )));
        }
        let (width, height) = (rgba_flipped.width, rgba_flipped.height);

        let needs_alloc = self
            .texture
            .as_ref()
            .is_none_or(|texture| texture.dims.needs_update(width, height));
        if needs_alloc {
            debug!(width, height, "Allocating software texture");
            self.texture = Some(SoftTexture {
                dims: CachedDimensions::new(width, height),
                rgba: vec![0; Frame::byte_len(width, height, PixelFormat::Rgba)],
            });
            self.stats.texture_allocations += 1;
        }
        if let Some(texture) = self.texture.as_mut() {
            texture.rgba.copy_from_slice(rgba_flipped.pixels());
        }
        self.stats.uploads += 1;
        Ok(())
    }

    fn ensure_offscreen_target(&mut self, size: Size) -> Result<(), GpuError> {
        if size.is_empty() {
            self.offscreen = None;
            return Ok(());
        }
        if self.offscreen.as_ref().is_some_and(|t| t.size == size) {
            return Ok(());
        }
        self.offscreen = None;

        #[cfg(test)]
        if std::mem::take(&mut self.fail_offscreen_allocation) {
            return Err(GpuError::ResourceAllocation(
                "simulated offscreen allocation failure".into(),
            ));
        }

        self.offscreen = Some(SoftTarget::new(size));
        self.stats.offscreen_allocations += 1;
        Ok(())
    }

    fn has_offscreen_target(&self) -> bool {
        self.offscreen.is_some()
    }

    fn render_visible(&mut self, pass: &CompositePass, size: Size) -> Result<(), GpuError> {
        let mut surface = match self.surface.take() {
            Some(surface) if surface.size == size => surface,
            _ => SoftTarget::new(size),
        };
        self.draw(&mut surface, pass);
        self.surface = Some(surface);
        self.stats.visible_renders += 1;
        Ok(())
    }

    fn render_offscreen(&mut self, pass: &CompositePass) -> Result<Vec<u8>, GpuError> {
        let mut target = self
            .offscreen
            .take()
            .ok_or_else(|| GpuError::ResourceAllocation("no offscreen target".into()))?;
        self.draw(&mut target, pass);
        let pixels = target.rgba.clone();
        self.offscreen = Some(target);
        self.stats.offscreen_renders += 1;
        Ok(pixels)
    }

    fn release(&mut self) {
        self.program = false;
        self.geometry = false;
        self.texture = None;
        self.offscreen = None;
        self.surface = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;

    fn pass(scale: [f32; 2]) -> CompositePass {
        CompositePass {
            scale,
            filter: FilterState::new(FilterKind::None, 1.0),
            flip_y: false,
        }
    }

    #[test]
    fn test_texture_reallocates_only_on_size_change() {
        let mut backend = SoftwareBackend::new();
        let a = Frame::solid_rgba(4, 4, [1, 1, 1, 255]).unwrap();
        let b = Frame::solid_rgba(4, 4, [2, 2, 2, 255]).unwrap();
        let c = Frame::solid_rgba(8, 4, [3, 3, 3, 255]).unwrap();

        backend.upload(&a).unwrap();
        backend.upload(&b).unwrap();
        assert_eq!(backend.stats().texture_allocations, 1);
        backend.upload(&c).unwrap();
        assert_eq!(backend.stats().texture_allocations, 2);
        assert_eq!(backend.stats().uploads, 3);
    }

    #[test]
    fn test_offscreen_target_lifecycle() {
        let mut backend = SoftwareBackend::new();
        backend.ensure_offscreen_target(Size::new(4, 4)).unwrap();
        backend.ensure_offscreen_target(Size::new(4, 4)).unwrap();
        assert_eq!(backend.stats().offscreen_allocations, 1);

        backend.ensure_offscreen_target(Size::new(0, 4)).unwrap();
        assert!(!backend.has_offscreen_target());
        assert!(backend.render_offscreen(&pass([1.0, 1.0])).is_err());
    }

    #[test]
    fn test_pillarbox_leaves_black_bars() {
        let mut backend = SoftwareBackend::new();
        backend.ensure_program().unwrap();
        backend.ensure_geometry().unwrap();
        backend
            .upload(&Frame::solid_rgba(2, 2, [255, 255, 255, 255]).unwrap())
            .unwrap();

        // Square frame on a 4x2 surface: drawn in the middle two columns
        let scale = crate::shaders::aspect_fit_scale(Size::new(2, 2), Size::new(4, 2));
        backend.render_visible(&pass(scale), Size::new(4, 2)).unwrap();

        let (size, rgba) = backend.surface().unwrap();
        assert_eq!(size, Size::new(4, 2));
        let row: Vec<&[u8]> = rgba[..16].chunks_exact(4).collect();
        assert_eq!(row[0], &CLEAR_COLOR);
        assert_eq!(row[1], &[255, 255, 255, 255]);
        assert_eq!(row[2], &[255, 255, 255, 255]);
        assert_eq!(row[3], &CLEAR_COLOR);
    }

    #[test]
    fn test_clear_only_without_texture() {
        let mut backend = SoftwareBackend::new();
        backend.ensure_program().unwrap();
        backend.render_visible(&pass([1.0, 1.0]), Size::new(2, 1)).unwrap();
        let (_, rgba) = backend.surface().unwrap();
        assert!(rgba.chunks_exact(4).all(|px| px == CLEAR_COLOR));
    }
}
