//! Mapping sources shared by every command.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use curvenode_core::{CurveMapping, EvalConfig, Extrapolation};

/// Built-in default mapping names.
const VECTOR_SOURCE: &str = "vector";
const RGB_SOURCE: &str = "rgb";

/// Where the mapping comes from, plus global overrides.
#[derive(Args, Debug, Clone)]
pub struct MappingArgs {
    /// Mapping JSON file, or `vector` / `rgb` for the node defaults
    pub mapping: String,

    /// Continue curves along their end tangents instead of clamping
    #[arg(long)]
    pub extrapolate: bool,
}

impl MappingArgs {
    pub fn load(&self) -> Result<CurveMapping> {
        let mut mapping = match self.mapping.as_str() {
            VECTOR_SOURCE => CurveMapping::vector(),
            RGB_SOURCE => CurveMapping::color(),
            path => load_mapping_file(Path::new(path))?,
        };
        if self.extrapolate {
            mapping.set_extend(Extrapolation::Extrapolate);
        }
        tracing::debug!(
            source = %self.mapping,
            channels = mapping.channel_count(),
            extend = ?mapping.extend(),
            "loaded mapping"
        );
        Ok(mapping)
    }
}

fn load_mapping_file(path: &Path) -> Result<CurveMapping> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping: {}", path.display()))?;
    CurveMapping::from_json_str(&json)
        .with_context(|| format!("Invalid mapping file: {}", path.display()))
}

/// Batch configuration from the environment, failing loudly on bad values.
pub fn eval_config() -> Result<EvalConfig> {
    EvalConfig::from_env().context("Invalid evaluation config")
}
