//! CLI command implementations

pub mod eval;
pub mod pack;
pub mod table;
pub mod wgsl;

use anyhow::{Result, bail};

/// Parse a comma-separated float tuple such as `0.1,0.2,0.3`.
pub fn parse_tuple(text: &str) -> Result<Vec<f32>> {
    let values = text
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| anyhow::anyhow!("bad component {part:?} in {text:?}: {e}"))
        })
        .collect::<Result<Vec<f32>>>()?;
    if values.is_empty() || values.len() > 4 {
        bail!("expected 1 to 4 components, got {} in {text:?}", values.len());
    }
    Ok(values)
}

/// Format floats for display.
pub fn format_values(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}
