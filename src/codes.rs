//! Code-to-name tables for countries and administrative divisions.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{GeocodeError, Result};
use crate::rows::{Row, RowReader};

const BUNDLED_COUNTRIES_PATH: &str = "data/countries.csv";
const BUNDLED_COUNTRIES: &str = include_str!("../data/countries.csv");

/// Maps an admin code to its display name.
///
/// Keys are bare country codes (`"FR"`), state codes (`"FR.11"`) or county
/// codes (`"FR.11.75"`). The table is immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CodeLookupTable {
    names: FxHashMap<String, String>,
}

impl CodeLookupTable {
    /// Builds a table from `(code, name, ..)` rows.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        rows.into_iter()
            .map(|row| (row.str(0).to_string(), row.str(1).to_string()))
            .collect()
    }

    /// Parses a GeoNames admin code dump (`admin1CodesASCII.txt` or
    /// `admin2Codes.txt`). Rows without a name column are skipped.
    pub fn parse_admin_codes(data: impl Read) -> Result<Self> {
        let mut reader = RowReader::tab_separated(data).min_columns(2);
        let table = Self::from_rows(reader.by_ref());
        let skipped = reader.finish()?;
        if skipped > 0 {
            log::warn!("skipped {skipped} malformed admin code rows");
        }
        Ok(table)
    }

    /// Loads the required `code,name` country table.
    ///
    /// Unlike the admin tables this file is strict: a missing file, a short row
    /// or an empty table is an error.
    pub fn load_countries(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| GeocodeError::io(path, e))?;
        Self::parse_countries(BufReader::new(file), path)
    }

    /// The country table compiled into the crate from `data/countries.csv`.
    pub fn bundled_countries() -> Result<Self> {
        Self::parse_countries(BUNDLED_COUNTRIES.as_bytes(), Path::new(BUNDLED_COUNTRIES_PATH))
    }

    fn parse_countries(data: impl Read, origin: &Path) -> Result<Self> {
        let mut reader = RowReader::comma_separated(data).min_columns(2);
        let table = Self::from_rows(reader.by_ref());
        let skipped = reader.finish()?;

        if skipped > 0 {
            return Err(GeocodeError::MalformedReference {
                path: origin.to_path_buf(),
                reason: format!("{skipped} rows are not `code,name` pairs"),
            });
        }
        if table.is_empty() {
            return Err(GeocodeError::MalformedReference {
                path: origin.to_path_buf(),
                reason: "no rows".to_string(),
            });
        }

        log::info!("Loaded {} countries from {}", table.len(), origin.display());
        Ok(table)
    }

    /// The name for `code`, or an empty string if the code is unknown.
    pub fn get(&self, code: &str) -> &str {
        self.lookup(code).unwrap_or("")
    }

    /// The name for `code`, if known.
    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Number of codes in the table.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table has no codes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CodeLookupTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }
}

/// Key of a first-level division in the state table, e.g. `FR.11`.
pub fn state_key(country_code: &str, state_code: &str) -> String {
    format!("{country_code}.{state_code}")
}

/// Key of a second-level division in the county table, e.g. `FR.11.75`.
pub fn county_key(country_code: &str, state_code: &str, county_code: &str) -> String {
    format!("{country_code}.{state_code}.{county_code}")
}
