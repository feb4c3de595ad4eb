//! Print the baked table of each channel.

use anyhow::Result;
use clap::Args;
use curvenode_core::{BakedChannel, TABLE_SEGMENTS};
use serde_json::json;

use crate::config::MappingArgs;

#[derive(Args)]
pub struct TableArgs {
    #[command(flatten)]
    pub source: MappingArgs,

    /// Print this many evenly spaced table samples per channel
    #[arg(short, long, default_value = "0")]
    pub samples: usize,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: TableArgs) -> Result<()> {
    let mapping = args.source.load()?;
    let baked = mapping.ensure_baked();

    if args.json {
        let channels: Vec<_> = baked
            .channels()
            .iter()
            .map(|ch| {
                json!({
                    "min_table": ch.min_table,
                    "max_table": ch.max_table,
                    "range": ch.range,
                    "in_gradient": ch.in_gradient,
                    "out_gradient": ch.out_gradient,
                    "samples": sample_table(ch, args.samples),
                })
            })
            .collect();
        let doc = json!({
            "extend": format!("{:?}", mapping.extend()),
            "channels": channels,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Extend: {:?}", mapping.extend());
    for (i, ch) in baked.channels().iter().enumerate() {
        println!(
            "Channel {i}: x in [{:.6}, {:.6}], range {:.6}, gradients in {:.6} out {:.6}",
            ch.min_table, ch.max_table, ch.range, ch.in_gradient, ch.out_gradient
        );
        for (x, y) in sample_table(ch, args.samples) {
            println!("  {x:>10.6} -> {y:.6}");
        }
    }
    Ok(())
}

/// `count` evenly spaced `(x, table value)` pairs, always including both ends.
fn sample_table(ch: &BakedChannel, count: usize) -> Vec<(f32, f32)> {
    if count == 0 {
        return Vec::new();
    }
    let table = ch.table();
    let steps = count.max(2) - 1;
    (0..=steps)
        .map(|s| {
            let i = s * TABLE_SEGMENTS / steps;
            let x = ch.min_table + (ch.max_table - ch.min_table) * i as f32 / TABLE_SEGMENTS as f32;
            (x, table[i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvenode_core::CurveMapping;

    #[test]
    fn test_sample_table_ends() {
        let baked = CurveMapping::vector().ensure_baked();
        let samples = sample_table(baked.channel(0), 3);
        assert_eq!(samples.len(), 3);
        assert!((samples[0].0 + 1.0).abs() < 1e-6);
        assert!((samples[2].0 - 1.0).abs() < 1e-6);
        assert!((samples[1].1).abs() < 1e-4);
        assert!(sample_table(baked.channel(0), 0).is_empty());
    }
}
