//! # Domain Models
//!
//! These structs represent the core entities of green-tips: the
//! administrative geography, the tips submitted against it, and the
//! transient values produced while ranking. We use UUID v7 for
//! time-ordered, globally unique identification; the id doubles as the
//! stable secondary sort key everywhere an ordering must be reproducible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// An immutable latitude/longitude pair, WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting coordinates outside the valid ranges
    /// (latitude -90..=90, longitude -180..=180) or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AppError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A country, the root of the administrative hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
}

/// A first-level administrative division (state, province, region).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
    pub country_id: Uuid,
}

/// A second-level division nested under a [`Region`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subregion {
    pub id: Uuid,
    pub name: String,
    pub region_id: Uuid,
}

/// A populated place with a fixed location.
///
/// Parent ids are optional: imported geography routinely misses a level,
/// and an absent parent means "no match possible at that tier" rather
/// than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub subregion_id: Option<Uuid>,
    pub region_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
}

/// A registered user. Credentials (password hash, session token) live in
/// the persistence layer and never travel on this model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A short piece of local advice, owned by the user who submitted it.
///
/// The four tag sets hold area ids, one set per tier; order is
/// irrelevant and any set may be empty. A tip with all four sets empty
/// is global and visible from every location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub text: String,
    /// Base relevance score. Starts at 0.0 and is adjusted by the
    /// external scoring process, never through this service's handlers.
    pub score: f64,
    pub cities: Vec<Uuid>,
    pub subregions: Vec<Uuid>,
    pub regions: Vec<Uuid>,
    pub countries: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Tip {
    /// Conjunctive test: a tip is global only when every tag set is
    /// empty. A tip tagged at a single tier (say, country only) is local
    /// to that tier, not global.
    pub fn is_global(&self) -> bool {
        self.cities.is_empty()
            && self.subregions.is_empty()
            && self.regions.is_empty()
            && self.countries.is_empty()
    }
}

/// Which tiers of a [`LocationContext`] a candidate tip matched.
///
/// Flags are independent; one tip may light up several tiers at once and
/// the ranker accumulates a bonus term per set flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierMatches {
    pub closest_city: bool,
    pub close_cities: bool,
    pub subregion: bool,
    pub region: bool,
    pub country: bool,
}

/// The geography resolved for one request: the closest city, the next
/// closest cities inside the search radius, and the closest city's parent
/// chain, dereferenced once up front so later stages never go back to the
/// index.
#[derive(Debug, Clone)]
pub struct LocationContext {
    pub closest_city: City,
    /// Ordered by distance ascending, city id as tie-break. Excludes
    /// `closest_city`.
    pub close_cities: Vec<City>,
    pub subregion: Option<Subregion>,
    pub region: Option<Region>,
    pub country: Option<Country>,
}

/// A tip paired with its computed boost score. Recomputed per query,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTip {
    pub tip: Tip,
    pub boost_score: f64,
}
