//! Emit the WGSL a material would link for a mapping.

use anyhow::Result;
use clap::Args;
use curvenode_core::CurveMapping;
use curvenode_gpu::{CURVES_WGSL, ColorBandAtlas, GpuError, GpuMaterial, ShaderCall, ShaderVariant};
use curvenode_nodes::{RgbCurvesNode, ShaderNode, VectorCurvesNode};

use crate::config::MappingArgs;

#[derive(Args)]
pub struct WgslArgs {
    #[command(flatten)]
    pub source: MappingArgs,

    /// Also print the `curves_*` function library
    #[arg(long)]
    pub library: bool,

    /// Texture expression bound to the color band
    #[arg(long, default_value = "curve_band")]
    pub band: String,

    /// Expression for the blend factor
    #[arg(long, default_value = "fac")]
    pub fac: String,

    /// Expression for the input value
    #[arg(long, default_value = "value")]
    pub input: String,

    /// Name bound to the result
    #[arg(long, default_value = "result")]
    pub output: String,
}

/// Collects linked calls for printing.
struct PrintMaterial {
    atlas: ColorBandAtlas,
    binding: String,
    lines: Vec<String>,
}

impl GpuMaterial for PrintMaterial {
    fn color_band(&mut self) -> &mut ColorBandAtlas {
        &mut self.atlas
    }

    fn color_band_binding(&self) -> &str {
        &self.binding
    }

    fn link(&mut self, call: ShaderCall) -> Result<(), GpuError> {
        self.lines.push(call.to_wgsl());
        Ok(())
    }
}

pub fn run(args: WgslArgs) -> Result<()> {
    let mapping = args.source.load()?;
    let mut material = PrintMaterial {
        atlas: ColorBandAtlas::new(),
        binding: args.band.clone(),
        lines: Vec::new(),
    };
    let variant = link(mapping, &mut material, &args.fac, &args.input, &args.output)?;
    tracing::info!(%variant, rows = material.atlas.row_count(), "linked curves call");

    if args.library {
        println!("{CURVES_WGSL}");
    }
    for line in &material.lines {
        println!("{line}");
    }
    Ok(())
}

fn link(
    mapping: CurveMapping,
    material: &mut PrintMaterial,
    fac: &str,
    input: &str,
    output: &str,
) -> Result<ShaderVariant> {
    let inputs = [fac, input];
    let variant = if mapping.channel_count() == 4 {
        RgbCurvesNode::from_mapping(mapping)?.gpu(material, &inputs, output)?
    } else {
        VectorCurvesNode::from_mapping(mapping)?.gpu(material, &inputs, output)?
    };
    Ok(variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rgb_links_fast_path() {
        let mut material = PrintMaterial {
            atlas: ColorBandAtlas::new(),
            binding: "band".into(),
            lines: Vec::new(),
        };
        let variant = link(CurveMapping::color(), &mut material, "f", "c", "r").unwrap();
        assert_eq!(variant, ShaderVariant::RgbOpti);
        assert!(material.lines[0].starts_with("let r = curves_rgb_opti(band, f, c, "));
    }

    #[test]
    fn test_vector_mapping_links_vec_call() {
        let mut material = PrintMaterial {
            atlas: ColorBandAtlas::new(),
            binding: "band".into(),
            lines: Vec::new(),
        };
        let variant = link(CurveMapping::vector(), &mut material, "f", "v", "r").unwrap();
        assert_eq!(variant, ShaderVariant::Vec);
        assert!(material.lines[0].starts_with("let r = curves_vec(band, f, v, "));
    }
}
