//! Core data structures for geographic information.
//!
//! This module defines the fundamental types used throughout the library:
//!
//! - [`LocationRecord`] - One city entry with resolved country, state and county names
//! - [`Location`] - Simple coordinate pair with distance calculations
//! - [`Match`] - A query result: an enriched record plus its distance from the query point

use serde::{Deserialize, Serialize};

/// One city entry of the dataset.
///
/// Records are produced by [`RecordNormalizer::normalize`](crate::RecordNormalizer::normalize),
/// persisted by the [`snapshot`](crate::snapshot) module and returned (enriched) by
/// [`GeocodeService::query`](crate::GeocodeService::query).
///
/// `country_name` is never written to a snapshot: it is resolved from the country
/// table at query time, so records held by the service keep it empty.
///
/// # Examples
///
/// ```no_run
/// # fn main() {
/// let record = &revgeo::lookup(48.8566, 2.3522).unwrap()[0];
///
/// println!("City: {}", record.city);
/// println!("State: {}", record.state_name);
/// println!("Country: {} ({})", record.country_name, record.country_code);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "JP", "FR")
    pub country_code: String,
    /// Full country name, filled in at query time (e.g., "France")
    #[serde(skip)]
    pub country_name: String,
    /// City or locality name (e.g., "Paris", "Tokyo")
    pub city: String,
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
    /// Number of inhabitants, 0 when the source does not say
    pub population: u64,
    /// First-level administrative division (e.g., "Île-de-France"), empty if unknown
    pub state_name: String,
    /// Second-level administrative division (e.g., "Paris"), empty if unknown
    pub county_name: String,
}

impl LocationRecord {
    /// The record's coordinates as a [`Location`].
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }
}

/// Returns `true` if the coordinates are finite and inside the valid
/// latitude/longitude ranges.
pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// A coordinate pair with distance calculation capabilities.
///
/// This is a simple wrapper around latitude and longitude coordinates that provides
/// utility methods for geographic calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl Location {
    /// Constructs a new Location from coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use revgeo::Location;
    ///
    /// let loc = Location::new(40.7128, -74.0060);
    /// assert_eq!(loc.latitude, 40.7128);
    /// assert_eq!(loc.longitude, -74.0060);
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Calculates the great-circle distance to another location using the haversine formula.
    ///
    /// Returns the distance in kilometers. This is only used to report how far a match
    /// lies from the query point; ranking uses planar distance on raw degrees.
    ///
    /// # Examples
    ///
    /// ```
    /// use revgeo::Location;
    ///
    /// let nyc = Location::new(40.7128, -74.0060);
    /// let la = Location::new(34.0522, -118.2437);
    ///
    /// let distance = nyc.distance_to(&la);
    /// assert!(distance > 3900.0 && distance < 4000.0); // ~3944 km
    /// ```
    pub fn distance_to(&self, other: &Location) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        6371.0 * c
    }
}

/// An enriched record returned by [`GeocodeService::query_k`](crate::GeocodeService::query_k).
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matched city, with `country_name` resolved
    pub record: LocationRecord,
    /// Great-circle distance from the query point in kilometers
    pub distance_km: f64,
}
