use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use revgeo::{ingest, ByteSource, DirSource, GeocoderConfig, HttpSource, SnapshotStore};

/// Download and normalize the GeoNames files, then write a snapshot
#[derive(Debug, Parser)]
#[command(name = "build-snapshot", version)]
struct Args {
    /// Output path (default: $REVGEO_SNAPSHOT or the cache directory)
    output: Option<PathBuf>,

    /// Read the GeoNames files from this directory instead of downloading them
    #[arg(long)]
    mirror: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = GeocoderConfig::from_env();
    let output = args.output.unwrap_or_else(|| config.snapshot_path.clone());
    println!("Building snapshot to: {}", output.display());

    let source: Box<dyn ByteSource> = match args.mirror {
        Some(dir) => Box::new(DirSource::new(dir)),
        None => Box::new(HttpSource::new()?),
    };
    let records = ingest(&config, &*source).context("ingesting GeoNames data")?;

    SnapshotStore::new(&output)
        .with_sources(config.sources())
        .save(&records)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("Snapshot built successfully! {} cities", records.len());
    Ok(())
}
