//! curvenode - evaluate and compile Vector/RGB Curves mappings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::eval::EvalArgs;
use commands::pack::PackArgs;
use commands::table::TableArgs;
use commands::wgsl::WgslArgs;

#[derive(Parser)]
#[command(name = "curvenode")]
#[command(author, version, about = "Curve mapping evaluation for Vector/RGB Curves nodes")]
#[command(long_about = "
Evaluate curve mappings on the CPU or GPU, inspect their baked tables and
emit the GPU parameters and WGSL calls a material would link.

A mapping is a JSON file or one of the built-in defaults `vector`
(3 channels over -1..1) and `rgb` (4 channels over 0..1).

Examples:
  curvenode eval rgb 0.2,0.4,0.6,1.0
  curvenode eval curves.json 0.5,0.5,0.5 --fac 0.5 --extrapolate
  curvenode eval curves.json 0.1,0.2,0.3 --gpu
  curvenode table curves.json --samples 9
  curvenode pack rgb
  curvenode wgsl curves.json --library
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a mapping for one or more values
    #[command(visible_alias = "e")]
    Eval(EvalArgs),

    /// Show the baked per-channel tables
    #[command(visible_alias = "t")]
    Table(TableArgs),

    /// Show the packed GPU parameters
    Pack(PackArgs),

    /// Emit the WGSL call (and optionally the snippet library)
    Wgsl(WgslArgs),
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "curvenode=debug,curvenode_core=debug,curvenode_gpu=debug,curvenode_nodes=debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Eval(args) => commands::eval::run(args),
        Commands::Table(args) => commands::table::run(args),
        Commands::Pack(args) => commands::pack::run(args),
        Commands::Wgsl(args) => commands::wgsl::run(args),
    }
}
