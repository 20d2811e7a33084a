//! Service configuration.
//!
//! Defaults point at the GeoNames dumps and keep every city. Each value can be
//! overridden through a `with_*` setter or a `REVGEO_*` environment variable
//! (see [`GeocoderConfig::from_env`]).

use std::path::PathBuf;

/// GeoNames city dump (all places with population ≥ 1000, or seats of an admin division).
pub const CITIES_URL: &str = "https://download.geonames.org/export/dump/cities1000.zip";
/// Member of the city archive holding the rows.
pub const CITIES_MEMBER: &str = "cities1000.txt";
/// First-level administrative division names.
pub const STATES_URL: &str = "https://download.geonames.org/export/dump/admin1CodesASCII.txt";
/// Second-level administrative division names.
pub const COUNTIES_URL: &str = "https://download.geonames.org/export/dump/admin2Codes.txt";
/// Default snapshot file name inside the cache directory.
pub const SNAPSHOT_FILE: &str = "geocode.json.gz";

/// Everything [`GeocodeService::new`](crate::GeocodeService::new) needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    /// Cities below this population are not indexed. 0 keeps everything.
    pub min_population: u64,
    /// Snapshot of the unfiltered record list.
    pub snapshot_path: PathBuf,
    /// `code,name` country table. `None` uses the table compiled into the crate.
    pub countries_path: Option<PathBuf>,
    /// City dump, either a zip archive or the plain text file.
    pub cities_url: String,
    /// File to read from the city archive.
    pub cities_member: String,
    /// State (admin1) code table.
    pub states_url: String,
    /// County (admin2) code table.
    pub counties_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            min_population: 0,
            snapshot_path: default_cache_dir().join(SNAPSHOT_FILE),
            countries_path: None,
            cities_url: CITIES_URL.to_string(),
            cities_member: CITIES_MEMBER.to_string(),
            states_url: STATES_URL.to_string(),
            counties_url: COUNTIES_URL.to_string(),
        }
    }
}

impl GeocoderConfig {
    /// Defaults overridden by environment variables:
    ///
    /// | Variable                | Field            |
    /// |-------------------------|------------------|
    /// | `REVGEO_MIN_POPULATION` | `min_population` |
    /// | `REVGEO_SNAPSHOT`       | `snapshot_path`  |
    /// | `REVGEO_COUNTRIES`      | `countries_path` |
    /// | `REVGEO_CITIES_URL`     | `cities_url`     |
    /// | `REVGEO_CITIES_MEMBER`  | `cities_member`  |
    /// | `REVGEO_STATES_URL`     | `states_url`     |
    /// | `REVGEO_COUNTIES_URL`   | `counties_url`   |
    ///
    /// An unparsable population keeps the default and logs a warning. Setting
    /// only `REVGEO_CITIES_URL` also points `cities_member` at the text file
    /// GeoNames ships inside that archive (`cities500.zip` holds `cities500.txt`).
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = var("REVGEO_MIN_POPULATION") {
            match value.trim().parse() {
                Ok(min) => config.min_population = min,
                Err(_) => log::warn!("ignoring REVGEO_MIN_POPULATION={value:?}: not a number"),
            }
        }
        if let Some(value) = var("REVGEO_SNAPSHOT") {
            config.snapshot_path = value.into();
        }
        if let Some(value) = var("REVGEO_COUNTRIES") {
            config.countries_path = Some(value.into());
        }
        if let Some(value) = var("REVGEO_CITIES_URL") {
            config.cities_member = archive_member(&value);
            config.cities_url = value;
        }
        if let Some(value) = var("REVGEO_CITIES_MEMBER") {
            config.cities_member = value;
        }
        if let Some(value) = var("REVGEO_STATES_URL") {
            config.states_url = value;
        }
        if let Some(value) = var("REVGEO_COUNTIES_URL") {
            config.counties_url = value;
        }
        config
    }

    /// Sets the population threshold.
    pub fn with_min_population(mut self, min_population: u64) -> Self {
        self.min_population = min_population;
        self
    }

    /// Sets the snapshot location.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Sets the country table location.
    pub fn with_countries_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.countries_path = Some(path.into());
        self
    }

    /// Sets the city dump URL and the archive member to read from it.
    pub fn with_cities(mut self, url: impl Into<String>, member: impl Into<String>) -> Self {
        self.cities_url = url.into();
        self.cities_member = member.into();
        self
    }

    /// Sets the state code table URL.
    pub fn with_states_url(mut self, url: impl Into<String>) -> Self {
        self.states_url = url.into();
        self
    }

    /// Sets the county code table URL.
    pub fn with_counties_url(mut self, url: impl Into<String>) -> Self {
        self.counties_url = url.into();
        self
    }

    /// The inputs a snapshot built from this config depends on. A snapshot
    /// recorded with different sources is not reused.
    pub fn sources(&self) -> Vec<String> {
        vec![
            self.cities_url.clone(),
            self.cities_member.clone(),
            self.states_url.clone(),
            self.counties_url.clone(),
        ]
    }
}

/// `cities500.zip` → `cities500.txt`. Non-archive names are returned as is.
fn archive_member(url: &str) -> String {
    let name = url.rsplit('/').next().unwrap_or(url);
    match name.strip_suffix(".zip") {
        Some(stem) => format!("{stem}.txt"),
        None => name.to_string(),
    }
}

/// `$XDG_CACHE_HOME/revgeo`, `$HOME/.cache/revgeo`, or `./.revgeo` as a last resort.
fn default_cache_dir() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .map(|dir| dir.join("revgeo"))
        .unwrap_or_else(|| PathBuf::from(".revgeo"))
}
