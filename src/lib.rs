//! Offline reverse geocoding: the nearest city to a coordinate.
//!
//! `revgeo` answers "which city is closest to (latitude, longitude)?" from the
//! GeoNames city dump, with the city's country, state and county names.
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), revgeo::GeocodeError> {
//! for place in revgeo::lookup(48.8566, 2.3522)? {
//!     println!("{}, {}, {}", place.city, place.state_name, place.country_name);
//!     // Output: Paris, Île-de-France, France
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For control over paths, sources and the population threshold, build a
//! [`GeocodeService`] yourself:
//!
//! ```no_run
//! # fn main() -> Result<(), revgeo::GeocodeError> {
//! use revgeo::{DirSource, GeocodeService, GeocoderConfig};
//!
//! let config = GeocoderConfig::default()
//!     .with_min_population(15_000)
//!     .with_snapshot_path("cache/geocode.json.gz");
//! let service = GeocodeService::new(&config, &DirSource::new("mirror/geonames"))?;
//!
//! let hits = service.query(35.6762, 139.6503);
//! println!("{}", hits[0].city);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ## Startup
//!
//! 1. Load the country table (`code,name` CSV, bundled unless a path is configured)
//! 2. Load the snapshot if one exists, otherwise:
//!    - download `admin1CodesASCII.txt`, `admin2Codes.txt` and `cities1000.zip`
//!    - join every city row with its state and county names
//!    - save the unfiltered list as the new snapshot
//! 3. Drop cities below the population threshold
//! 4. Build a k-d tree over the remaining coordinates
//!
//! The snapshot is a gzip-compressed, versioned JSON document. It is written
//! atomically and an unreadable or outdated one simply triggers ingestion again.
//!
//! ## Lookup Algorithm
//!
//! 1. Descend the k-d tree to the query point's cell
//! 2. Unwind, visiting the other side of a split only if it can hold a closer city
//! 3. Map the winning point back to its record and resolve the country name
//!
//! Distance is squared Euclidean on raw degrees. That is not great-circle
//! distance: near the poles and across the antimeridian the "nearest" city can
//! differ from the geographically nearest one.
//!
//! # Thread Safety
//!
//! After construction nothing is mutated, so a [`GeocodeService`] (and the
//! global one behind [`lookup()`]) can be queried from any number of threads
//! without locks.
//!
//! # Data Sources
//!
//! City and admin data come from [GeoNames.org](https://www.geonames.org/),
//! licensed under [CC BY 4.0](https://creativecommons.org/licenses/by/4.0/).
//!
//! # Modules
//!
//! - [`types`] - Core data structures ([`LocationRecord`], [`Location`], [`Match`])
//! - [`index`] - The k-d tree
//! - [`normalize`] - City row normalization and population filtering
//! - [`snapshot`] - The on-disk cache
//! - [`codes`] - Code-to-name tables
//! - [`rows`] - Delimited row iteration
//! - [`source`] - Byte sources for the raw files
//! - [`config`] - Service configuration

#![warn(missing_docs)]

pub mod codes;
pub mod config;
mod error;
pub mod index;
pub mod normalize;
pub mod rows;
mod service;
pub mod snapshot;
pub mod source;
pub mod types;

pub use codes::CodeLookupTable;
pub use config::GeocoderConfig;
pub use error::{GeocodeError, Result};
pub use index::{Neighbor, SpatialIndex};
pub use normalize::{filter_population, NormalizeStats, RecordNormalizer};
pub use service::{ingest, GeocodeService};
pub use snapshot::SnapshotStore;
#[cfg(feature = "builder")]
pub use source::HttpSource;
pub use source::{ByteSource, DirSource, MemorySource};
pub use types::{Location, LocationRecord, Match};

/// Nearest city to the given coordinates, from the process-wide service.
///
/// The first call builds the service from [`GeocoderConfig::from_env`]: it
/// reads the snapshot or, if there is none, downloads and ingests the GeoNames
/// files. Later calls only query.
///
/// # Errors
///
/// Returns the construction error if the service could not be built. Nothing is
/// cached in that case, so a later call retries.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> Result<(), revgeo::GeocodeError> {
/// // Tokyo coordinates
/// if let Some(place) = revgeo::lookup(35.6762, 139.6503)?.first() {
///     println!("{}, {}", place.city, place.country_name);
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "builder")]
pub fn lookup(latitude: f64, longitude: f64) -> Result<Vec<LocationRecord>> {
    Ok(GeocodeService::global()?.query(latitude, longitude))
}
