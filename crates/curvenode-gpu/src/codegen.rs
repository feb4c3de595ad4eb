//! Shader-code generation for curve node calls.
//!
//! The material compiler is an injected collaborator ([`GpuMaterial`]): it
//! owns the color-band atlas, binds the texture and splices generated calls
//! into its shader. [`link_curves`] packs a mapping against it and emits the
//! variant call.

use curvenode_core::CurveMapping;

use crate::color_band::ColorBandAtlas;
use crate::error::GpuError;
use crate::params::{PackedCurves, ShaderVariant, pack};

/// WGSL source of the `curves_*` snippet library.
pub const CURVES_WGSL: &str = include_str!("../shaders/curves.wgsl");

/// Host-side GPU material being compiled.
pub trait GpuMaterial {
    /// Atlas rows for this material are appended here.
    fn color_band(&mut self) -> &mut ColorBandAtlas;

    /// WGSL expression naming the bound color-band texture.
    fn color_band_binding(&self) -> &str;

    /// Splice a generated call into the material.
    fn link(&mut self, call: ShaderCall) -> Result<(), GpuError>;
}

/// One generated `curves_*` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderCall {
    pub packed: PackedCurves,
    /// Texture expression passed as `band`.
    pub band: String,
    /// `f32` expression for the blend factor.
    pub fac: String,
    /// `vec3<f32>` or `vec4<f32>` expression for the input.
    pub input: String,
    /// Name bound to the result.
    pub output: String,
}

impl ShaderCall {
    pub fn function_name(&self) -> &'static str {
        self.packed.variant.function_name()
    }

    /// `let <output> = curves_*(band, fac, input, layer, range, ext...);`
    pub fn to_wgsl(&self) -> String {
        let packed = &self.packed;
        let mut args = vec![
            self.band.clone(),
            self.fac.clone(),
            self.input.clone(),
            wgsl_f32_literal(packed.layer),
        ];
        match packed.variant {
            ShaderVariant::Vec => {
                args.push(wgsl_vec_literal(&packed.range, 3));
                args.extend(packed.ext.iter().take(3).map(|e| wgsl_vec_literal(e, 4)));
            }
            ShaderVariant::Rgb | ShaderVariant::RgbOpti => {
                args.push(wgsl_vec_literal(&packed.range, 4));
                args.extend(packed.ext.iter().map(|e| wgsl_vec_literal(e, 4)));
            }
        }
        format!(
            "let {} = {}({});",
            self.output,
            self.function_name(),
            args.join(", ")
        )
    }
}

/// Pack `mapping` into `material` and link the resulting call.
pub fn link_curves(
    material: &mut dyn GpuMaterial,
    mapping: &CurveMapping,
    fac: &str,
    input: &str,
    output: &str,
) -> Result<ShaderVariant, GpuError> {
    let packed = pack(mapping, material.color_band());
    let variant = packed.variant;
    let call = ShaderCall {
        packed,
        band: material.color_band_binding().to_owned(),
        fac: fac.to_owned(),
        input: input.to_owned(),
        output: output.to_owned(),
    };
    material.link(call)?;
    Ok(variant)
}

/// Format `v` as a WGSL float literal that round-trips to the same `f32`.
///
/// Non-finite values have no literal form and are clamped to `±f32::MAX`.
pub fn wgsl_f32_literal(v: f32) -> String {
    let v = if v.is_nan() {
        tracing::warn!("NaN uniform replaced by 0.0");
        0.0
    } else if v.is_infinite() {
        tracing::warn!(value = v, "infinite uniform clamped");
        f32::MAX.copysign(v)
    } else {
        v
    };
    // Debug formatting is the shortest round-trip representation and
    // always carries a '.' or an exponent.
    format!("{v:?}")
}

/// `vecN<f32>(...)` with `n` components, zero-padded.
fn wgsl_vec_literal(values: &[f32], n: usize) -> String {
    let parts: Vec<String> = (0..n)
        .map(|i| wgsl_f32_literal(values.get(i).copied().unwrap_or(0.0)))
        .collect();
    format!("vec{n}<f32>({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvenode_core::Extrapolation;

    struct RecordingMaterial {
        atlas: ColorBandAtlas,
        calls: Vec<ShaderCall>,
    }

    impl GpuMaterial for RecordingMaterial {
        fn color_band(&mut self) -> &mut ColorBandAtlas {
            &mut self.atlas
        }

        fn color_band_binding(&self) -> &str {
            "curve_band"
        }

        fn link(&mut self, call: ShaderCall) -> Result<(), GpuError> {
            self.calls.push(call);
            Ok(())
        }
    }

    fn material() -> RecordingMaterial {
        RecordingMaterial {
            atlas: ColorBandAtlas::new(),
            calls: Vec::new(),
        }
    }

    #[test]
    fn test_literals_round_trip() {
        for v in [0.0f32, 1.0, -1.0, 0.1, 1e8, 1e-8, 3.402_823_5e38, 0.123_456_79] {
            let lit = wgsl_f32_literal(v);
            assert!(lit.contains('.') || lit.contains('e'), "{lit}");
            assert_eq!(lit.parse::<f32>().unwrap(), v);
        }
        assert_eq!(wgsl_f32_literal(f32::INFINITY), format!("{:?}", f32::MAX));
        assert_eq!(wgsl_f32_literal(f32::NAN), "0.0");
    }

    #[test]
    fn test_fast_path_call() {
        let mut mat = material();
        let variant =
            link_curves(&mut mat, &CurveMapping::color(), "fac", "color", "result").unwrap();
        assert_eq!(variant, ShaderVariant::RgbOpti);
        let wgsl = mat.calls[0].to_wgsl();
        assert_eq!(
            wgsl,
            "let result = curves_rgb_opti(curve_band, fac, color, 0.0, \
             vec4<f32>(1.0, 1.0, 1.0, 1.0), vec4<f32>(0.0, 0.0, 1.0, 0.0));"
        );
    }

    #[test]
    fn test_rgb_call_carries_four_ext_rows() {
        let mut mapping = CurveMapping::color();
        mapping.set_extend(Extrapolation::Extrapolate);
        let mut mat = material();
        link_curves(&mut mat, &CurveMapping::vector(), "1.0", "v", "a").unwrap();
        link_curves(&mut mat, &mapping, "f", "c", "b").unwrap();
        let wgsl = mat.calls[1].to_wgsl();
        assert!(wgsl.starts_with("let b = curves_rgb(curve_band, f, c, 1.0, "));
        assert_eq!(wgsl.matches("vec4<f32>(").count(), 5);
        assert_eq!(mat.atlas.row_count(), 2);
    }

    #[test]
    fn test_vec_call_shape() {
        let mut mat = material();
        link_curves(&mut mat, &CurveMapping::vector(), "0.5", "n", "out").unwrap();
        let wgsl = mat.calls[0].to_wgsl();
        assert!(wgsl.starts_with("let out = curves_vec(curve_band, 0.5, n, 0.0, vec3<f32>(0.5, 0.5, 0.5), "));
        assert_eq!(wgsl.matches("vec4<f32>(-1.0, 0.0, 1.0, 0.0)").count(), 3);
    }

    #[test]
    fn test_library_defines_every_variant() {
        for variant in [ShaderVariant::Vec, ShaderVariant::Rgb, ShaderVariant::RgbOpti] {
            let decl = format!("fn {}(", variant.function_name());
            assert!(CURVES_WGSL.contains(&decl), "missing {decl}");
        }
    }
}
