//! curvenode GPU: parameter packing, WGSL generation and a wgpu compute
//! evaluator for curve mappings.
//!
//! No node-graph dependency. Materials plug in through [`GpuMaterial`];
//! [`CurvesCompute`] runs the same snippets headless for verification.

pub mod codegen;
pub mod color_band;
pub mod compute;
pub mod error;
pub mod params;

pub use codegen::{CURVES_WGSL, GpuMaterial, ShaderCall, link_curves, wgsl_f32_literal};
pub use color_band::{ColorBandAtlas, ColorBandTexture};
pub use compute::{CurvesCompute, request_headless_device};
pub use error::GpuError;
pub use params::{CurvesUniformsGpu, PackedCurves, ShaderVariant, is_fast_linear_rgb, pack};
