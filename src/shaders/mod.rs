// SPDX-License-Identifier: GPL-3.0-only

//! Compositor shader and shared GPU helpers
//!
//! The same WGSL program draws the visible preview and the offscreen target
//! used for the virtual camera, so both outputs always match.

pub mod compositor;
mod gpu_processor;

pub use compositor::{
    CompositePass, CompositeUniforms, QUAD_VERTICES, Vertex, aspect_fit_scale,
    aspect_fit_scale_or_default,
};
pub use gpu_processor::{
    CachedDimensions, padded_bytes_per_row, read_buffer_async, strip_row_padding,
};

/// Aspect-fit compositor with colour filters (WGSL)
/// Entry points: `vs_main`, `fs_main`
pub const FILTER_COMPOSITE_SHADER: &str = include_str!("filter_composite.wgsl");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compositor_shader_validates() {
        let module = naga::front::wgsl::parse_str(FILTER_COMPOSITE_SHADER)
            .expect("compositor shader should parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .expect("compositor shader should validate");

        let entry_points: Vec<&str> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(entry_points.contains(&"vs_main"));
        assert!(entry_points.contains(&"fs_main"));
    }
}
