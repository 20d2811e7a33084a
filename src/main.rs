use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use revgeo::{ByteSource, DirSource, GeocodeService, GeocoderConfig, HttpSource};

/// Print the city nearest to a coordinate
#[derive(Debug, Parser)]
#[command(name = "revgeo", version, allow_negative_numbers = true)]
struct Args {
    /// Latitude in decimal degrees
    latitude: f64,

    /// Longitude in decimal degrees
    longitude: f64,

    /// Number of cities to show, nearest first
    #[arg(short = 'k', long = "count", default_value_t = 1)]
    count: usize,

    /// Ignore cities with fewer inhabitants
    #[arg(long)]
    min_population: Option<u64>,

    /// Snapshot file to read, or to create on first run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Country table (`code,name` CSV)
    #[arg(long)]
    countries: Option<PathBuf>,

    /// Read the GeoNames files from this directory instead of downloading them
    #[arg(long)]
    mirror: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut config = GeocoderConfig::from_env();
    if let Some(min) = args.min_population {
        config = config.with_min_population(min);
    }
    if let Some(path) = &args.snapshot {
        config = config.with_snapshot_path(path);
    }
    if let Some(path) = &args.countries {
        config = config.with_countries_path(path);
    }

    let source = byte_source(args.mirror.as_ref())?;
    let service = GeocodeService::new(&config, &*source).context("building geocoder")?;

    let matches = service.query_k(args.latitude, args.longitude, args.count);
    if matches.is_empty() {
        println!("No place found");
    }

    for m in matches {
        let place = &m.record;
        println!("{}", place.city);
        println!("  State: {}", place.state_name);
        println!("  County: {}", place.county_name);
        println!("  Country: {} ({})", place.country_name, place.country_code);
        println!("  Population: {}", place.population);
        println!("  Coords: {}, {}", place.latitude, place.longitude);
        println!("  Distance: {:.1} km", m.distance_km);
    }

    Ok(())
}

fn byte_source(mirror: Option<&PathBuf>) -> anyhow::Result<Box<dyn ByteSource>> {
    let source: Box<dyn ByteSource> = match mirror {
        Some(dir) => Box::new(DirSource::new(dir)),
        None => Box::new(HttpSource::new()?),
    };
    Ok(source)
}
