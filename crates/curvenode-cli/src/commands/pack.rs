//! Print the GPU parameters a material would receive.

use anyhow::Result;
use clap::Args;
use curvenode_gpu::{ColorBandAtlas, pack};
use serde_json::json;

use crate::config::MappingArgs;

#[derive(Args)]
pub struct PackArgs {
    #[command(flatten)]
    pub source: MappingArgs,
}

pub fn run(args: PackArgs) -> Result<()> {
    let mapping = args.source.load()?;
    let mut atlas = ColorBandAtlas::new();
    let packed = pack(&mapping, &mut atlas);

    let doc = json!({
        "variant": packed.variant.function_name(),
        "layer": packed.layer,
        "range": packed.range,
        "ext": packed.ext,
        "atlas_rows": atlas.row_count(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
