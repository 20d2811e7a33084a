//! The geocoder itself and the ingestion pipeline that feeds it.

use std::time::Instant;

use crate::codes::CodeLookupTable;
use crate::config::GeocoderConfig;
use crate::error::Result;
use crate::index::SpatialIndex;
use crate::normalize::{filter_population, RecordNormalizer};
use crate::snapshot::SnapshotStore;
use crate::source::{unpack_member, ByteSource};
use crate::types::{LocationRecord, Match};

/// The reverse geocoder: the record list, its k-d tree and the country table.
///
/// Everything is immutable after construction, so one service can be shared
/// by any number of threads without locking.
pub struct GeocodeService {
    records: Vec<LocationRecord>,
    index: SpatialIndex,
    countries: CodeLookupTable,
}

impl GeocodeService {
    /// Builds the service.
    ///
    /// 1. Loads the country table from `config.countries_path`, or the bundled
    ///    table when no path is set.
    /// 2. Loads the snapshot at `config.snapshot_path`; if there is none, or it
    ///    was built from other sources than `config.sources()`, fetches and
    ///    normalizes the GeoNames files through `source` and saves the result
    ///    as the new snapshot.
    /// 3. Drops cities below `config.min_population`.
    /// 4. Indexes what is left.
    ///
    /// The snapshot always holds the *unfiltered* list while the index only
    /// holds the filtered one. This lets runs with different thresholds share
    /// one snapshot; do not filter before saving.
    ///
    /// Failing to save the snapshot is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Fails if a configured country table is missing or malformed, or if ingestion is
    /// needed and a source file cannot be fetched or read.
    pub fn new(config: &GeocoderConfig, source: &dyn ByteSource) -> Result<Self> {
        let started = Instant::now();
        let countries = match &config.countries_path {
            Some(path) => CodeLookupTable::load_countries(path)?,
            None => CodeLookupTable::bundled_countries()?,
        };

        let store = SnapshotStore::new(&config.snapshot_path).with_sources(config.sources());
        let records = match store.load() {
            Some(records) => records,
            None => {
                let records = ingest(config, source)?;
                if let Err(err) = store.save(&records) {
                    log::warn!("Could not save snapshot, next startup will ingest again: {err}");
                }
                records
            }
        };

        let total = records.len();
        let records = filter_population(records, config.min_population);
        if records.len() < total {
            log::info!(
                "Kept {} of {total} cities with population >= {}",
                records.len(),
                config.min_population
            );
        }

        let service = Self::from_records(records, countries);
        log::info!(
            "Geocoder ready: {} cities indexed in {:?}",
            service.len(),
            started.elapsed()
        );
        Ok(service)
    }

    /// Builds the service from records already in memory.
    pub fn from_records(records: Vec<LocationRecord>, countries: CodeLookupTable) -> Self {
        let points: Vec<(f64, f64)> = records
            .iter()
            .map(|r| (r.latitude, r.longitude))
            .collect();
        let index = SpatialIndex::build(&points);

        Self {
            records,
            index,
            countries,
        }
    }

    /// Process-wide service built from [`GeocoderConfig::from_env`], downloading
    /// over HTTP on first use if no snapshot exists yet.
    ///
    /// A failed initialization is not cached; the next call tries again.
    #[cfg(feature = "builder")]
    pub fn global() -> Result<&'static Self> {
        use once_cell::sync::OnceCell;

        static GEOCODER: OnceCell<GeocodeService> = OnceCell::new();

        GEOCODER.get_or_try_init(|| {
            let source = crate::source::HttpSource::new()?;
            Self::new(&GeocoderConfig::from_env(), &source)
        })
    }

    /// The city nearest to `(latitude, longitude)`, with its country name
    /// filled in.
    ///
    /// Returns one record, or none if the service holds no cities.
    pub fn query(&self, latitude: f64, longitude: f64) -> Vec<LocationRecord> {
        self.index
            .nearest(latitude, longitude, 1)
            .into_iter()
            .map(|n| self.enrich(n.index))
            .collect()
    }

    /// The `k` nearest cities, nearest first, each with its great-circle
    /// distance from the query point.
    pub fn query_k(&self, latitude: f64, longitude: f64, k: usize) -> Vec<Match> {
        let origin = crate::types::Location::new(latitude, longitude);
        self.index
            .nearest(latitude, longitude, k)
            .into_iter()
            .map(|n| {
                let record = self.enrich(n.index);
                Match {
                    distance_km: origin.distance_to(&record.location()),
                    record,
                }
            })
            .collect()
    }

    /// Nearest city for each coordinate pair, in input order.
    pub fn search(&self, coordinates: &[(f64, f64)]) -> Vec<Option<LocationRecord>> {
        coordinates
            .iter()
            .map(|&(lat, lon)| self.query(lat, lon).into_iter().next())
            .collect()
    }

    /// Country name for an ISO code, empty if unknown.
    pub fn country_name(&self, country_code: &str) -> &str {
        self.countries.get(country_code)
    }

    /// The indexed records (population filter applied, country names not resolved).
    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }

    /// Number of indexed cities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no cities are indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn enrich(&self, idx: usize) -> LocationRecord {
        let mut record = self.records[idx].clone();
        record.country_name = self.countries.get(&record.country_code).to_string();
        record
    }
}

/// Fetches and normalizes the GeoNames sources named in `config`.
///
/// Returns the full, unfiltered record list.
pub fn ingest(config: &GeocoderConfig, source: &dyn ByteSource) -> Result<Vec<LocationRecord>> {
    log::info!("Downloading admin codes...");
    let states = CodeLookupTable::parse_admin_codes(source.fetch(&config.states_url)?.as_slice())?;
    let counties =
        CodeLookupTable::parse_admin_codes(source.fetch(&config.counties_url)?.as_slice())?;
    log::info!(
        "Loaded {} state and {} county names",
        states.len(),
        counties.len()
    );

    log::info!("Downloading cities...");
    let cities = unpack_member(source.fetch(&config.cities_url)?, &config.cities_member)?;

    let normalizer = RecordNormalizer::new(states, counties);
    let (records, stats) = normalizer.normalize(cities.as_slice())?;
    log::info!(
        "Normalized {} cities ({} rows skipped)",
        stats.records,
        stats.skipped
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, lat: f64, lon: f64, country: &str, population: u64) -> LocationRecord {
        LocationRecord {
            country_code: country.into(),
            country_name: String::new(),
            city: name.into(),
            latitude: lat,
            longitude: lon,
            population,
            state_name: String::new(),
            county_name: String::new(),
        }
    }

    fn paris_and_versailles() -> GeocodeService {
        GeocodeService::from_records(
            vec![
                city("Versailles", 48.8049, 2.1204, "FR", 85_000),
                city("Paris", 48.8566, 2.3522, "FR", 2_000_000),
            ],
            [("FR", "France")].into_iter().collect(),
        )
    }

    #[test]
    fn returns_paris_over_versailles() {
        let hits = paris_and_versailles().query(48.85, 2.35);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].city, "Paris");
        assert_eq!(hits[0].country_name, "France");
    }

    #[test]
    fn unknown_country_resolves_to_empty() {
        let service = GeocodeService::from_records(
            vec![city("Atlantis", 0.0, 0.0, "ZZ", 1)],
            [("FR", "France")].into_iter().collect(),
        );
        let hits = service.query(1.0, 1.0);
        assert_eq!(hits[0].country_name, "");
    }

    #[test]
    fn empty_service_returns_no_match() {
        let service = GeocodeService::from_records(Vec::new(), CodeLookupTable::default());
        assert!(service.is_empty());
        assert!(service.query(48.85, 2.35).is_empty());
        assert!(service.query_k(48.85, 2.35, 3).is_empty());
        assert_eq!(service.search(&[(0.0, 0.0)]), vec![None]);
    }

    #[test]
    fn stored_records_stay_unenriched() {
        let service = paris_and_versailles();
        service.query(48.85, 2.35);
        assert!(service.records().iter().all(|r| r.country_name.is_empty()));
    }

    #[test]
    fn query_k_orders_by_distance() {
        let matches = paris_and_versailles().query_k(48.85, 2.35, 5);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].record.city, "Paris");
        assert_eq!(matches[1].record.city, "Versailles");
        assert!(matches[0].distance_km < 1.0);
        assert!(matches[1].distance_km > 15.0 && matches[1].distance_km < 20.0);
    }

    #[test]
    fn search_answers_each_coordinate() {
        let hits = paris_and_versailles().search(&[(48.80, 2.12), (48.86, 2.35)]);
        let names: Vec<&str> = hits
            .iter()
            .map(|h| h.as_ref().map_or("", |r| r.city.as_str()))
            .collect();
        assert_eq!(names, vec!["Versailles", "Paris"]);
    }

    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeocodeService>();

        let service = paris_and_versailles();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| assert_eq!(service.query(48.85, 2.35)[0].city, "Paris"));
            }
        });
    }
}
