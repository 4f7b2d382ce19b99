// SPDX-License-Identifier: GPL-3.0-only

//! Host side of the filter compositor shader
//!
//! Computes the aspect-fit scale, packs the uniform block and defines the
//! static quad. Shared by the wgpu and software render backends so both
//! rasterize the same geometry.

use crate::constants::DEFAULT_FRAME_ASPECT;
use crate::filter::FilterState;
use crate::media::Size;

/// Scale that fits a frame inside a target without distortion
///
/// The vertex stage divides positions by this value, so the axis with a
/// component above 1 is shrunk. The result always keeps the whole frame
/// visible and centred. Degenerate sizes yield `(1, 1)`.
pub fn aspect_fit_scale(frame: Size, target: Size) -> [f32; 2] {
    match (frame.aspect(), target.aspect()) {
        (Some(frame_aspect), Some(target_aspect)) => fit_aspects(frame_aspect, target_aspect),
        _ => [1.0, 1.0],
    }
}

/// Aspect-fit scale for an optional frame, defaulting to 16:9 before the first
/// frame arrives
pub fn aspect_fit_scale_or_default(frame: Option<Size>, target: Size) -> [f32; 2] {
    let Some(target_aspect) = target.aspect() else {
        return [1.0, 1.0];
    };
    let frame_aspect = frame
        .and_then(|size| size.aspect())
        .unwrap_or(DEFAULT_FRAME_ASPECT.0 / DEFAULT_FRAME_ASPECT.1);
    fit_aspects(frame_aspect, target_aspect)
}

fn fit_aspects(frame_aspect: f32, target_aspect: f32) -> [f32; 2] {
    if frame_aspect > target_aspect {
        [1.0, frame_aspect / target_aspect]
    } else {
        [target_aspect / frame_aspect, 1.0]
    }
}

/// Uniform block of `filter_composite.wgsl`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniforms {
    pub scale: [f32; 2],
    pub strength: f32,
    pub filter_kind: u32,
}

/// Parameters of one render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositePass {
    /// Aspect-fit scale
    pub scale: [f32; 2],
    pub filter: FilterState,
    /// Mirror vertically, for targets that are read back bottom-up
    pub flip_y: bool,
}

impl CompositePass {
    pub fn uniforms(&self) -> CompositeUniforms {
        let y_sign = if self.flip_y { -1.0 } else { 1.0 };
        CompositeUniforms {
            scale: [self.scale[0], self.scale[1] * y_sign],
            strength: self.filter.strength(),
            filter_kind: self.filter.kind().gpu_index(),
        }
    }
}

/// Quad vertex: clip-space position and texture coordinate
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Full-screen quad drawn as a 4-vertex triangle strip
///
/// `v` runs top to bottom, the fragment stage flips it back to match the
/// row-flipped texture upload.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex {
        position: [-1.0, -1.0],
        tex_coord: [0.0, 1.0],
    },
    Vertex {
        position: [1.0, -1.0],
        tex_coord: [1.0, 1.0],
    },
    Vertex {
        position: [-1.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    Vertex {
        position: [1.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
];

/// Half extents of the drawn quad in normalized device coordinates
pub fn visible_extent(scale: [f32; 2]) -> [f32; 2] {
    [1.0 / scale[0].abs(), 1.0 / scale[1].abs()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;

    #[test]
    fn test_equal_aspect_is_identity() {
        assert_eq!(
            aspect_fit_scale(Size::new(1920, 1080), Size::new(1280, 720)),
            [1.0, 1.0]
        );
        assert_eq!(
            aspect_fit_scale(Size::new(640, 480), Size::new(640, 480)),
            [1.0, 1.0]
        );
    }

    #[test]
    fn test_wide_frame_shrinks_vertically() {
        let scale = aspect_fit_scale(Size::new(1920, 1080), Size::new(800, 800));
        assert_eq!(scale[0], 1.0);
        assert!((scale[1] - 16.0 / 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_tall_frame_shrinks_horizontally() {
        let scale = aspect_fit_scale(Size::new(480, 640), Size::new(1280, 720));
        assert_eq!(scale[1], 1.0);
        assert!(scale[0] > 1.0);
    }

    #[test]
    fn test_fit_never_crops_and_keeps_aspect() {
        let frames = [(1920, 1080), (480, 640), (1000, 1000), (3, 1), (7, 13)];
        let targets = [(1280, 720), (100, 400), (640, 480), (1, 1), (999, 37)];
        for frame in frames {
            for target in targets {
                let frame = Size::from(frame);
                let target = Size::from(target);
                let scale = aspect_fit_scale(frame, target);
                let [ex, ey] = visible_extent(scale);

                // Quad stays within the target
                assert!(ex <= 1.0 + 1e-6 && ey <= 1.0 + 1e-6);
                // One axis always fills the target
                assert!((ex - 1.0).abs() < 1e-6 || (ey - 1.0).abs() < 1e-6);
                // Drawn aspect equals the frame aspect
                let drawn = ex * target.width as f32 / (ey * target.height as f32);
                let expected = frame.width as f32 / frame.height as f32;
                assert!((drawn - expected).abs() / expected < 1e-4);
            }
        }
    }

    #[test]
    fn test_degenerate_sizes() {
        assert_eq!(aspect_fit_scale(Size::new(0, 10), Size::new(10, 10)), [1.0, 1.0]);
        assert_eq!(aspect_fit_scale(Size::new(10, 10), Size::new(10, 0)), [1.0, 1.0]);
    }

    #[test]
    fn test_default_aspect_without_frame() {
        assert_eq!(aspect_fit_scale_or_default(None, Size::new(1600, 900)), [1.0, 1.0]);
    }

    #[test]
    fn test_uniforms_pack_filter_and_flip() {
        let pass = CompositePass {
            scale: [1.0, 2.0],
            filter: FilterState::new(FilterKind::Cool, 0.5),
            flip_y: true,
        };
        let uniforms = pass.uniforms();
        assert_eq!(uniforms.scale, [1.0, -2.0]);
        assert_eq!(uniforms.filter_kind, 5);
        assert_eq!(uniforms.strength, 0.5);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 16);
    }
}
