// SPDX-License-Identifier: GPL-3.0-only

//! Colour filter selection and the CPU reference of the filter shader

use crate::constants::filter::{COOL_SHIFT, LUMA_WEIGHTS, SEPIA, WARM_SHIFT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter types applied by the compositor
///
/// The discriminant is the value written to the shader's `filter` uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Pass-through
    #[default]
    None = 0,
    /// Rec.601 luma
    Grayscale = 1,
    /// Classic sepia matrix
    Sepia = 2,
    /// Negative
    Invert = 3,
    /// Slight red/green lift, blue cut
    Warm = 4,
    /// Slight blue/green lift, red cut
    Cool = 5,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::None,
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Invert,
        FilterKind::Warm,
        FilterKind::Cool,
    ];

    /// Value passed to the shader
    pub fn gpu_index(&self) -> u32 {
        *self as u32
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
            FilterKind::Warm => "warm",
            FilterKind::Cool => "cool",
        }
    }

    /// Unclamped filter target for a normalized RGB colour
    fn target(&self, c: [f32; 3]) -> [f32; 3] {
        match self {
            FilterKind::None => c,
            FilterKind::Grayscale => {
                let luma = dot(c, LUMA_WEIGHTS);
                [luma, luma, luma]
            }
            FilterKind::Sepia => [dot(c, SEPIA[0]), dot(c, SEPIA[1]), dot(c, SEPIA[2])],
            FilterKind::Invert => [1.0 - c[0], 1.0 - c[1], 1.0 - c[2]],
            FilterKind::Warm => add(c, WARM_SHIFT),
            FilterKind::Cool => add(c, COOL_SHIFT),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown filter '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

#[inline]
fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Current filter selection
///
/// `strength` is always within `[0, 1]`; setters clamp on assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    kind: FilterKind,
    strength: f32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            kind: FilterKind::None,
            strength: 1.0,
        }
    }
}

impl FilterState {
    pub fn new(kind: FilterKind, strength: f32) -> Self {
        Self {
            kind,
            strength: clamp_strength(strength),
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_kind(&mut self, kind: FilterKind) {
        self.kind = kind;
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp_strength(strength);
    }

    /// Apply the filter to one RGBA pixel, matching the fragment shader
    pub fn apply_rgba(&self, px: [u8; 4]) -> [u8; 4] {
        if self.kind == FilterKind::None || self.strength == 0.0 {
            return px;
        }
        let c = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        let target = self.kind.target(c);
        let mut out = [0u8; 4];
        for i in 0..3 {
            let t = target[i].clamp(0.0, 1.0);
            let mixed = c[i] + (t - c[i]) * self.strength;
            out[i] = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        out[3] = px[3];
        out
    }
}

fn clamp_strength(strength: f32) -> f32 {
    if strength.is_finite() {
        strength.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [[u8; 4]; 5] = [
        [0, 0, 0, 255],
        [255, 255, 255, 255],
        [200, 120, 60, 128],
        [3, 250, 77, 0],
        [90, 90, 200, 255],
    ];

    #[test]
    fn test_strength_is_clamped() {
        assert_eq!(FilterState::new(FilterKind::Sepia, 1.7).strength(), 1.0);
        assert_eq!(FilterState::new(FilterKind::Sepia, -0.3).strength(), 0.0);
        assert_eq!(FilterState::new(FilterKind::Sepia, f32::NAN).strength(), 0.0);

        let mut state = FilterState::default();
        state.set_strength(0.25);
        assert_eq!(state.strength(), 0.25);
    }

    #[test]
    fn test_zero_strength_is_identity_for_every_filter() {
        for kind in FilterKind::ALL {
            let state = FilterState::new(kind, 0.0);
            for px in SAMPLES {
                assert_eq!(state.apply_rgba(px), px, "{} changed {:?}", kind, px);
            }
        }
    }

    #[test]
    fn test_full_strength_targets() {
        let invert = FilterState::new(FilterKind::Invert, 1.0);
        assert_eq!(invert.apply_rgba([200, 120, 60, 128]), [55, 135, 195, 128]);

        let gray = FilterState::new(FilterKind::Grayscale, 1.0);
        let out = gray.apply_rgba([255, 0, 0, 255]);
        assert_eq!(out, [76, 76, 76, 255]);

        let warm = FilterState::new(FilterKind::Warm, 1.0);
        assert_eq!(warm.apply_rgba([255, 255, 0, 255]), [255, 255, 0, 255]);
    }

    #[test]
    fn test_alpha_passes_through() {
        for kind in FilterKind::ALL {
            let state = FilterState::new(kind, 1.0);
            assert_eq!(state.apply_rgba([10, 20, 30, 42])[3], 42);
        }
    }

    #[test]
    fn test_half_strength_is_between() {
        let state = FilterState::new(FilterKind::Invert, 0.5);
        let out = state.apply_rgba([0, 255, 100, 255]);
        assert!((out[0] as i32 - 128).abs() <= 1);
        assert!((out[1] as i32 - 128).abs() <= 1);
        assert!((out[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_parse_and_gpu_index() {
        assert_eq!("Sepia".parse::<FilterKind>(), Ok(FilterKind::Sepia));
        assert!("vivid".parse::<FilterKind>().is_err());
        let indices: Vec<u32> = FilterKind::ALL.iter().map(|k| k.gpu_index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
