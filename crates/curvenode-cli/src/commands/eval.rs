//! Evaluate a mapping for values given on the command line.

use anyhow::{Result, bail};
use clap::Args;
use curvenode_core::{CurveMapping, IndexMask, VArray, evaluate_premultiplied_rgb};
use curvenode_gpu::{CurvesCompute, request_headless_device};
use curvenode_nodes::{RgbCurvesNode, VectorCurvesNode};
use glam::{Vec3, Vec4};

use super::{format_values, parse_tuple};
use crate::config::{MappingArgs, eval_config};

#[derive(Args)]
pub struct EvalArgs {
    #[command(flatten)]
    pub source: MappingArgs,

    /// Values as `x,y,z` or `r,g,b,a`
    #[arg(required = true)]
    pub values: Vec<String>,

    /// Blend factor between input (0) and mapped value (1)
    #[arg(short, long, default_value = "1.0")]
    pub fac: f32,

    /// Evaluate r,g,b through the black/white levels instead
    #[arg(long)]
    pub premultiplied: bool,

    /// Black level as `r,g,b` (with --premultiplied)
    #[arg(long, default_value = "0,0,0")]
    pub black: String,

    /// White level as `r,g,b` (with --premultiplied)
    #[arg(long, default_value = "1,1,1")]
    pub white: String,

    /// Evaluate with the GPU compute pipeline
    #[arg(long, conflicts_with = "premultiplied")]
    pub gpu: bool,
}

pub fn run(args: EvalArgs) -> Result<()> {
    let mut mapping = args.source.load()?;
    let inputs = args
        .values
        .iter()
        .map(|v| parse_tuple(v))
        .collect::<Result<Vec<_>>>()?;

    let outputs = if args.premultiplied {
        let black = level(&args.black)?;
        let white = level(&args.white)?;
        mapping.set_black_white(black, white);
        inputs
            .iter()
            .map(|v| evaluate_premultiplied_rgb(&mapping, vec3(v)).to_array().to_vec())
            .collect()
    } else if args.gpu {
        evaluate_gpu(&mapping, args.fac, &inputs)?
    } else {
        evaluate_cpu(mapping, args.fac, &inputs)?
    };

    for (input, output) in inputs.iter().zip(&outputs) {
        println!("({}) -> ({})", format_values(input), format_values(output));
    }
    Ok(())
}

fn evaluate_cpu(mapping: CurveMapping, fac: f32, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
    let config = eval_config()?;
    let mask = IndexMask::full(inputs.len());
    match mapping.channel_count() {
        3 => {
            let function = VectorCurvesNode::from_mapping(mapping)?.multi_function(config);
            let values: Vec<Vec3> = inputs.iter().map(|v| vec3(v)).collect();
            let mut out = vec![Vec3::ZERO; values.len()];
            function.apply(&mask, VArray::Single(fac), VArray::Span(&values[..]), &mut out)?;
            Ok(out.iter().map(|v| v.to_array().to_vec()).collect())
        }
        4 => {
            let function = RgbCurvesNode::from_mapping(mapping)?.multi_function(config);
            let values: Vec<Vec4> = inputs.iter().map(|v| vec4(v)).collect();
            let mut out = vec![Vec4::ZERO; values.len()];
            function.apply(&mask, VArray::Single(fac), VArray::Span(&values[..]), &mut out)?;
            Ok(out.iter().map(|v| v.to_array().to_vec()).collect())
        }
        n => bail!("cannot evaluate a {n}-channel mapping, expected 3 or 4"),
    }
}

fn evaluate_gpu(mapping: &CurveMapping, fac: f32, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
    let (device, queue) = request_headless_device()?;
    let compute = CurvesCompute::new(device, queue);
    let values: Vec<[f32; 4]> = inputs.iter().map(|v| vec4(v).to_array()).collect();
    let facs = vec![fac; values.len()];
    let results = compute.evaluate_mapping(mapping, &facs, &values)?;
    let width = mapping.channel_count();
    Ok(results.iter().map(|r| r[..width].to_vec()).collect())
}

fn level(text: &str) -> Result<[f32; 3]> {
    let values = parse_tuple(text)?;
    match values.as_slice() {
        [v] => Ok([*v; 3]),
        [r, g, b] => Ok([*r, *g, *b]),
        _ => bail!("level {text:?} needs 1 or 3 components"),
    }
}

fn component(v: &[f32], i: usize, default: f32) -> f32 {
    v.get(i).copied().unwrap_or(default)
}

fn vec3(v: &[f32]) -> Vec3 {
    Vec3::new(component(v, 0, 0.0), component(v, 1, 0.0), component(v, 2, 0.0))
}

/// Missing alpha defaults to opaque.
fn vec4(v: &[f32]) -> Vec4 {
    vec3(v).extend(component(v, 3, 1.0))
}
