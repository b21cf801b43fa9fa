//! Times the full bundling pipeline over a static export.
//!
//! Runs scan, inline, router and compose back to back `--iter` times and
//! reports each run, the average, and the size of the produced document.
//! Nothing is written to disk.
//!
//! Run with: cargo run --release --example benchmark -- --iter 10
//!
//! Defaults to the bundled fixture site; pass `--input out` to time a real
//! export.

use clap::Parser;
use next_single_file::{config, output, pipeline};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "benchmark")]
#[command(about = "Time repeated builds of a static Next.js export")]
struct Args {
    /// Static export directory
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/site"))]
    input: PathBuf,

    /// Number of builds to run
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    iter: u32,

    /// Config file (TOML), merged over the stock defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref())?;

    println!("==> Benchmarking {}", args.input.display());
    let mut runs = Vec::new();
    let mut last = None;
    for _ in 0..args.iter {
        let start = Instant::now();
        let result = pipeline::build(&args.input, &config)?;
        runs.push(start.elapsed());
        last = Some(result);
    }

    if let Some(result) = last {
        output::print_benchmark_output(&runs, &result);
    }
    Ok(())
}
