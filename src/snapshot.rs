//! Compressed on-disk cache of the ingested record list.
//!
//! A snapshot is a gzip stream around one JSON document:
//!
//! ```text
//! {
//!   "version": 2,
//!   "created_at": "2026-10-18T09:12:44Z",
//!   "sources": ["https://download.geonames.org/export/dump/cities1000.zip", ...],
//!   "records": [{"country_code": "FR", ...}, ...]
//! }
//! ```
//!
//! The layout follows [`LocationRecord`] field for field, so any change to that
//! struct must bump [`SNAPSHOT_VERSION`]. Snapshots with another version are
//! rejected rather than migrated. `sources` names the inputs the records were
//! built from; a store created [`with_sources`](SnapshotStore::with_sources)
//! rejects snapshots built from anything else.
//!
//! Reading never fails hard: a missing, corrupt, truncated or stale snapshot is
//! reported as `None` and the caller re-ingests. Writing goes to a temporary
//! file in the target directory which is then renamed over the target, so a
//! reader only ever sees a complete snapshot. Two processes regenerating at
//! the same time resolve as last writer wins.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{GeocodeError, Result};
use crate::types::LocationRecord;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    created_at: DateTime<Utc>,
    sources: &'a [String],
    records: &'a [LocationRecord],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(default)]
    sources: Vec<String>,
    records: Vec<LocationRecord>,
}

#[derive(Debug, thiserror::Error)]
enum ReadError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("format version {found}, expected {}", SNAPSHOT_VERSION)]
    Version { found: u32 },

    #[error("built from {found:?}, expected {expected:?}")]
    Sources {
        found: Vec<String>,
        expected: Vec<String>,
    },
}

/// Reads and writes the record snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    sources: Option<Vec<String>>,
}

impl SnapshotStore {
    /// Creates a store for the snapshot at `path` that accepts a snapshot
    /// whatever it was built from.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sources: None,
        }
    }

    /// Records `sources` in saved snapshots and only loads snapshots that
    /// were saved with the same list.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, or `None` if there is no usable one.
    pub fn load(&self) -> Option<Vec<LocationRecord>> {
        match self.read() {
            Ok(snapshot) => {
                log::info!(
                    "Loaded {} records from snapshot {} (created {})",
                    snapshot.records.len(),
                    self.path.display(),
                    snapshot.created_at.to_rfc3339()
                );
                Some(snapshot.records)
            }
            Err(ReadError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No snapshot at {}", self.path.display());
                None
            }
            Err(err) => {
                log::warn!("Ignoring snapshot {}: {err}", self.path.display());
                None
            }
        }
    }

    fn read(&self) -> std::result::Result<Snapshot, ReadError> {
        let file = File::open(&self.path)?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(decoder))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ReadError::Version {
                found: snapshot.version,
            });
        }
        if let Some(expected) = &self.sources {
            if *expected != snapshot.sources {
                return Err(ReadError::Sources {
                    found: snapshot.sources,
                    expected: expected.clone(),
                });
            }
        }
        Ok(snapshot)
    }

    /// Writes `records` as the new snapshot, replacing any previous one.
    pub fn save(&self, records: &[LocationRecord]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| GeocodeError::io(dir, e))?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| GeocodeError::io(dir, e))?;
        let mut encoder = GzEncoder::new(BufWriter::new(tmp), Compression::default());
        serde_json::to_writer(
            &mut encoder,
            &SnapshotRef {
                version: SNAPSHOT_VERSION,
                created_at: Utc::now(),
                sources: self.sources.as_deref().unwrap_or_default(),
                records,
            },
        )?;

        let tmp = encoder
            .finish()
            .and_then(|writer| writer.into_inner().map_err(io::IntoInnerError::into_error))
            .map_err(|e| GeocodeError::io(&self.path, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| GeocodeError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| GeocodeError::io(&self.path, e.error))?;

        log::info!(
            "Saved {} records to snapshot {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(city: &str, lat: f64, lon: f64, population: u64) -> LocationRecord {
        LocationRecord {
            country_code: "FR".into(),
            country_name: String::new(),
            city: city.into(),
            latitude: lat,
            longitude: lon,
            population,
            state_name: "Île-de-France".into(),
            county_name: String::new(),
        }
    }

    fn edge_records() -> Vec<LocationRecord> {
        vec![
            record("Paris", 48.8566, 2.3522, 2_000_000),
            record("", 90.0, 180.0, 0),
            record("South", -90.0, -180.0, u64::MAX),
            LocationRecord {
                country_code: String::new(),
                state_name: String::new(),
                ..record("Zero", 0.0, -0.0, 1)
            },
            record("Tiny", 1e-300, -123.456_789_012_345, 7),
        ]
    }

    #[test]
    fn round_trips_edge_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("geocode.json.gz"));
        let records = edge_records();

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn round_trips_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("empty.json.gz"));

        store.save(&[]).unwrap();
        assert_eq!(store.load().unwrap(), Vec::<LocationRecord>::new());
    }

    #[test]
    fn country_name_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("geocode.json.gz"));
        let mut paris = record("Paris", 48.8566, 2.3522, 1);
        paris.country_name = "France".into();

        store.save(&[paris]).unwrap();
        assert_eq!(store.load().unwrap()[0].country_name, "");
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SnapshotStore::new(dir.path().join("absent.json.gz"))
            .load()
            .is_none());
    }

    #[test]
    fn corrupt_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode.json.gz");
        fs::write(&path, b"definitely not gzip").unwrap();

        assert!(SnapshotStore::new(path).load().is_none());
    }

    #[test]
    fn truncated_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("geocode.json.gz"));
        store.save(&edge_records()).unwrap();

        let bytes = fs::read(store.path()).unwrap();
        fs::write(store.path(), &bytes[..bytes.len() / 2]).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn other_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode.json.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        write!(
            encoder,
            r#"{{"version": {}, "created_at": "2024-01-01T00:00:00Z", "records": []}}"#,
            SNAPSHOT_VERSION + 1
        )
        .unwrap();
        encoder.finish().unwrap();

        assert!(SnapshotStore::new(path).load().is_none());
    }

    #[test]
    fn snapshot_from_other_sources_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocode.json.gz");
        let sources = |cities: &str| vec![cities.to_string(), "mem://admin1.txt".to_string()];

        SnapshotStore::new(&path)
            .with_sources(sources("mem://cities1000.zip"))
            .save(&edge_records())
            .unwrap();

        let same = SnapshotStore::new(&path).with_sources(sources("mem://cities1000.zip"));
        assert_eq!(same.load().unwrap(), edge_records());

        let other = SnapshotStore::new(&path).with_sources(sources("mem://cities500.zip"));
        assert!(other.load().is_none());

        // a store without expectations takes whatever is there
        assert!(SnapshotStore::new(&path).load().is_some());
    }

    #[test]
    fn save_replaces_previous_snapshot_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("geocode.json.gz"));

        store.save(&edge_records()).unwrap();
        let replacement = vec![record("Versailles", 48.8049, 2.1204, 85_000)];
        store.save(&replacement).unwrap();

        assert_eq!(store.load().unwrap(), replacement);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("cache/revgeo/geocode.json.gz"));

        store.save(&edge_records()).unwrap();
        assert!(store.load().is_some());
    }
}
