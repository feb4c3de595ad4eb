//! GPU parameter packing for curve mappings.
//!
//! Packing turns a mapping into the color-band row it samples, the shader
//! variant to call and the `range`/`ext` uniforms that variant takes. The
//! uniforms come straight from the baked channels, so the shader evaluates
//! with the same domain and gradients as the CPU.

use bytemuck::{Pod, Zeroable};
use curvenode_core::{BakedMapping, CurveMapping, Extrapolation};

use crate::color_band::ColorBandAtlas;

/// Shader function a packed mapping links against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    /// Three channels applied to a vector.
    Vec,
    /// Four channels applied to a color.
    Rgb,
    /// Color whose R, G and B channels are identity lines; only alpha is
    /// remapped through the domain transform.
    RgbOpti,
}

impl ShaderVariant {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Vec => "curves_vec",
            Self::Rgb => "curves_rgb",
            Self::RgbOpti => "curves_rgb_opti",
        }
    }

    /// Discriminant written into [`CurvesUniformsGpu::variant`].
    pub fn id(self) -> u32 {
        match self {
            Self::Vec => 0,
            Self::Rgb => 1,
            Self::RgbOpti => 2,
        }
    }
}

impl std::fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Uniforms of one packed mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedCurves {
    pub variant: ShaderVariant,
    /// Color-band row holding the tables.
    pub layer: f32,
    /// Per-channel range scale.
    pub range: Vec<f32>,
    /// Per-channel `(min_table, in_gradient, max_table, out_gradient)`.
    /// `RgbOpti` carries the alpha tuple only.
    pub ext: Vec<[f32; 4]>,
}

impl PackedCurves {
    /// Fixed-layout uniform block. `RgbOpti` places its alpha tuple in row 3.
    pub fn to_uniforms(&self) -> CurvesUniformsGpu {
        let mut range = [0.0f32; 4];
        for (dst, src) in range.iter_mut().zip(&self.range) {
            *dst = *src;
        }
        let mut ext = [[0.0f32; 4]; 4];
        match self.variant {
            ShaderVariant::RgbOpti => {
                if let Some(alpha) = self.ext.first() {
                    ext[3] = *alpha;
                }
            }
            ShaderVariant::Vec | ShaderVariant::Rgb => {
                for (dst, src) in ext.iter_mut().zip(&self.ext) {
                    *dst = *src;
                }
            }
        }
        CurvesUniformsGpu {
            range,
            ext,
            layer: self.layer,
            variant: self.variant.id(),
            channel_count: self.range.len() as u32,
            _pad: 0,
        }
    }
}

/// Uniform block matching `CurvesUniforms` in `curves.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CurvesUniformsGpu {
    pub range: [f32; 4],
    pub ext: [[f32; 4]; 4],
    pub layer: f32,
    pub variant: u32,
    pub channel_count: u32,
    pub _pad: u32,
}

/// True when channels 0..3 of a 4-channel mapping are the identity line
/// (0,0)-(1,1) and evaluate as a plain clamped lookup: unit range and no
/// extension gradient.
pub fn is_fast_linear_rgb(mapping: &CurveMapping, baked: &BakedMapping) -> bool {
    if mapping.channel_count() != 4 || mapping.extend() != Extrapolation::Clamp {
        return false;
    }
    mapping.channels()[..3]
        .iter()
        .zip(&baked.channels()[..3])
        .all(|(authored, channel)| {
            authored.is_unit_identity()
                && channel.range == 1.0
                && channel.in_gradient == 0.0
                && channel.out_gradient == 0.0
        })
}

/// Bake `mapping` if needed, append its row to `atlas` and derive the
/// uniforms.
pub fn pack(mapping: &CurveMapping, atlas: &mut ColorBandAtlas) -> PackedCurves {
    let baked = mapping.ensure_baked();
    let layer = atlas.push_mapping(&baked);

    let variant = match mapping.channel_count() {
        4 if is_fast_linear_rgb(mapping, &baked) => ShaderVariant::RgbOpti,
        4 => ShaderVariant::Rgb,
        _ => ShaderVariant::Vec,
    };

    let range = baked.channels().iter().map(|ch| ch.range).collect();
    let ext = match variant {
        ShaderVariant::RgbOpti => vec![baked.channel(3).ext_uniform()],
        ShaderVariant::Vec | ShaderVariant::Rgb => {
            baked.channels().iter().map(|ch| ch.ext_uniform()).collect()
        }
    };

    tracing::debug!(%variant, layer, "packed curve mapping");

    PackedCurves {
        variant,
        layer,
        range,
        ext,
    }
}
