//! Joins raw GeoNames city rows with the state and county tables.
//!
//! The city dump (`cities1000.txt`) is tab-separated with 19 columns; only the
//! ones listed in [`columns`] are read. Unknown admin codes resolve to empty
//! names and bad rows are skipped, so a single defect never fails ingestion.

use std::io::Read;

use crate::codes::{county_key, state_key, CodeLookupTable};
use crate::error::Result;
use crate::rows::{Row, RowReader};
use crate::types::{valid_coordinates, LocationRecord};

/// Column positions in the GeoNames city dump.
pub mod columns {
    /// Place name (utf8).
    pub const CITY: usize = 1;
    /// Latitude in decimal degrees.
    pub const LATITUDE: usize = 4;
    /// Longitude in decimal degrees.
    pub const LONGITUDE: usize = 5;
    /// ISO 3166-1 alpha-2 country code.
    pub const COUNTRY_CODE: usize = 8;
    /// First-level admin code (see `admin1CodesASCII.txt`).
    pub const STATE_CODE: usize = 10;
    /// Second-level admin code (see `admin2Codes.txt`).
    pub const COUNTY_CODE: usize = 11;
    /// Population.
    pub const POPULATION: usize = 14;
}

const MIN_COLUMNS: usize = columns::POPULATION + 1;

/// Outcome counts of one normalization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Records produced.
    pub records: usize,
    /// Rows dropped as malformed (short, unreadable or bad coordinates).
    pub skipped: usize,
}

/// Turns raw city rows into [`LocationRecord`]s.
///
/// Owns the state and county tables for the duration of ingestion; they are
/// dropped together with the normalizer.
pub struct RecordNormalizer {
    states: CodeLookupTable,
    counties: CodeLookupTable,
}

impl RecordNormalizer {
    /// Creates a normalizer resolving names through the given tables.
    pub fn new(states: CodeLookupTable, counties: CodeLookupTable) -> Self {
        Self { states, counties }
    }

    /// Normalizes a whole city dump.
    ///
    /// Returns the records in source order, unfiltered.
    pub fn normalize(&self, data: impl Read) -> Result<(Vec<LocationRecord>, NormalizeStats)> {
        let mut reader = RowReader::tab_separated(data).min_columns(MIN_COLUMNS);
        let mut bad_coordinates = 0;

        let records: Vec<LocationRecord> = reader
            .by_ref()
            .filter_map(|row| {
                let record = self.normalize_row(&row);
                if record.is_none() {
                    bad_coordinates += 1;
                }
                record
            })
            .collect();

        let stats = NormalizeStats {
            records: records.len(),
            skipped: reader.finish()? + bad_coordinates,
        };
        if stats.skipped > 0 {
            log::warn!("skipped {} malformed city rows", stats.skipped);
        }
        Ok((records, stats))
    }

    /// Builds one record, or `None` if the row's coordinates are unusable.
    ///
    /// Population defaults to 0 when missing or garbled.
    pub fn normalize_row(&self, row: &Row) -> Option<LocationRecord> {
        let latitude = row.f64(columns::LATITUDE)?;
        let longitude = row.f64(columns::LONGITUDE)?;
        if !valid_coordinates(latitude, longitude) {
            return None;
        }

        let country_code = row.str(columns::COUNTRY_CODE);
        let state_code = row.str(columns::STATE_CODE);
        let county_code = row.str(columns::COUNTY_CODE);

        Some(LocationRecord {
            country_code: country_code.to_string(),
            country_name: String::new(),
            city: row.str(columns::CITY).to_string(),
            latitude,
            longitude,
            population: row.u64(columns::POPULATION).unwrap_or(0),
            state_name: self
                .states
                .get(&state_key(country_code, state_code))
                .to_string(),
            county_name: self
                .counties
                .get(&county_key(country_code, state_code, county_code))
                .to_string(),
        })
    }
}

/// Keeps records with `population >= min_population`.
///
/// A threshold of 0 keeps everything.
pub fn filter_population(
    mut records: Vec<LocationRecord>,
    min_population: u64,
) -> Vec<LocationRecord> {
    if min_population > 0 {
        records.retain(|r| r.population >= min_population);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_row(
        name: &str,
        lat: &str,
        lon: &str,
        cc: &str,
        a1: &str,
        a2: &str,
        pop: &str,
    ) -> String {
        // geonameid, name, asciiname, alternatenames, lat, lon, class, code, cc, cc2,
        // admin1, admin2, admin3, admin4, population, elevation, dem, timezone, modified
        format!(
            "1\t{name}\t{name}\t\t{lat}\t{lon}\tP\tPPL\t{cc}\t\t{a1}\t{a2}\t\t\t{pop}\t\t\
             35\tEurope/Paris\t2024-01-01\n"
        )
    }

    fn normalizer() -> RecordNormalizer {
        RecordNormalizer::new(
            [("FR.11", "Île-de-France")].into_iter().collect(),
            [("FR.11.75", "Paris"), ("FR.11.78", "Yvelines")]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn resolves_state_and_county() {
        let data = city_row("Paris", "48.85341", "2.3488", "FR", "11", "75", "2138551");
        let (records, stats) = normalizer().normalize(data.as_bytes()).unwrap();

        assert_eq!(stats, NormalizeStats { records: 1, skipped: 0 });
        let paris = &records[0];
        assert_eq!(paris.city, "Paris");
        assert_eq!(paris.country_code, "FR");
        assert_eq!(paris.country_name, "");
        assert_eq!(paris.latitude, 48.85341);
        assert_eq!(paris.longitude, 2.3488);
        assert_eq!(paris.population, 2_138_551);
        assert_eq!(paris.state_name, "Île-de-France");
        assert_eq!(paris.county_name, "Paris");
    }

    #[test]
    fn unknown_codes_degrade_to_empty_names() {
        let data = city_row("Nowhere", "10.0", "10.0", "XX", "01", "02", "5");
        let (records, _) = normalizer().normalize(data.as_bytes()).unwrap();

        assert_eq!(records[0].state_name, "");
        assert_eq!(records[0].county_name, "");
    }

    #[test]
    fn county_lookup_is_scoped_by_state() {
        // county "75" exists under FR.11 only
        let data = city_row("Elsewhere", "45.0", "5.0", "FR", "84", "75", "10");
        let (records, _) = normalizer().normalize(data.as_bytes()).unwrap();
        assert_eq!(records[0].county_name, "");
    }

    #[test]
    fn garbled_population_defaults_to_zero() {
        let data = city_row("A", "1.0", "1.0", "FR", "11", "75", "lots")
            + &city_row("B", "2.0", "2.0", "FR", "11", "75", "");
        let (records, stats) = normalizer().normalize(data.as_bytes()).unwrap();

        assert_eq!(stats.skipped, 0);
        assert_eq!(records[0].population, 0);
        assert_eq!(records[1].population, 0);
    }

    #[test]
    fn skips_malformed_rows_and_continues() {
        let data = city_row("A", "1.0", "1.0", "FR", "11", "75", "1")
            + "too\tfew\tcolumns\n"
            + &city_row("Bad", "north", "1.0", "FR", "11", "75", "1")
            + &city_row("Far", "91.0", "1.0", "FR", "11", "75", "1")
            + &city_row("B", "2.0", "-180.0", "FR", "11", "75", "1");
        let (records, stats) = normalizer().normalize(data.as_bytes()).unwrap();

        assert_eq!(stats, NormalizeStats { records: 2, skipped: 3 });
        assert_eq!(records[0].city, "A");
        assert_eq!(records[1].city, "B");
    }

    #[test]
    fn normalization_is_deterministic() {
        let data = city_row("A", "1.0", "1.0", "FR", "11", "75", "1")
            + &city_row("B", "2.0", "2.0", "FR", "11", "78", "2");
        let first = normalizer().normalize(data.as_bytes()).unwrap();
        let second = normalizer().normalize(data.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    fn with_populations(pops: &[u64]) -> Vec<LocationRecord> {
        pops.iter()
            .map(|&population| LocationRecord {
                country_code: "FR".into(),
                country_name: String::new(),
                city: format!("c{population}"),
                latitude: 0.0,
                longitude: 0.0,
                population,
                state_name: String::new(),
                county_name: String::new(),
            })
            .collect()
    }

    #[test]
    fn zero_threshold_keeps_everything() {
        let records = with_populations(&[0, 5, 100]);
        assert_eq!(filter_population(records.clone(), 0), records);
    }

    #[test]
    fn threshold_is_inclusive() {
        let kept = filter_population(with_populations(&[0, 99, 100, 101]), 100);
        let pops: Vec<u64> = kept.iter().map(|r| r.population).collect();
        assert_eq!(pops, vec![100, 101]);
    }

    #[test]
    fn higher_threshold_yields_subset() {
        let records = with_populations(&[0, 1, 10, 500, 1_000, 15_000, 2_000_000]);
        let thresholds = [0, 1, 10, 11, 1_000, 20_000, u64::MAX];

        for (i, &low) in thresholds.iter().enumerate() {
            for &high in &thresholds[i..] {
                let wide = filter_population(records.clone(), low);
                let narrow = filter_population(records.clone(), high);
                assert!(narrow.iter().all(|r| wide.contains(r)), "{high} vs {low}");
            }
        }
    }
}
