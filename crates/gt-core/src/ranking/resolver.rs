//! Nearest-city resolution.
//!
//! One radius query against the geo index yields the closest city and the
//! next closest cities. The closest city's parent chain is dereferenced
//! here, once, so later stages never touch the index again. A missing or
//! dangling parent link downgrades that tier to absent; resolution itself
//! only fails when the index does.

use log::warn;

use crate::error::{AppError, Result};
use crate::models::{GeoPoint, LocationContext};
use crate::traits::GeoIndex;

/// Resolves `point` to a [`LocationContext`], or `None` when no city lies
/// within `radius_km`. `max_cities` bounds the resolved cities, the
/// closest one included.
pub async fn resolve(
    geo: &dyn GeoIndex,
    point: GeoPoint,
    radius_km: f64,
    max_cities: usize,
) -> Result<Option<LocationContext>> {
    let hits = geo
        .query_radius(point, radius_km)
        .await
        .map_err(|e| AppError::Unavailable(format!("geo index: {}", e)))?;

    // The index returns hits ascending by (distance, id); the first hit
    // is the closest city and the remainder feed close_cities.
    let mut cities = hits.into_iter().map(|(city, _distance)| city);
    let closest_city = match cities.next() {
        Some(city) => city,
        None => return Ok(None),
    };
    let close_cities: Vec<_> = cities.take(max_cities.saturating_sub(1)).collect();

    let subregion = match closest_city.subregion_id {
        Some(id) => {
            let found = geo
                .subregion(id)
                .await
                .map_err(|e| AppError::Unavailable(format!("geo index: {}", e)))?;
            if found.is_none() {
                warn!(
                    "city {} references missing subregion {}; tier treated as absent",
                    closest_city.id, id
                );
            }
            found
        }
        None => None,
    };

    // The city's own region link wins; a city known only through its
    // subregion still resolves a region via the subregion's parent.
    let region_id = closest_city
        .region_id
        .or_else(|| subregion.as_ref().map(|s| s.region_id));
    let region = match region_id {
        Some(id) => {
            let found = geo
                .region(id)
                .await
                .map_err(|e| AppError::Unavailable(format!("geo index: {}", e)))?;
            if found.is_none() {
                warn!(
                    "city {} references missing region {}; tier treated as absent",
                    closest_city.id, id
                );
            }
            found
        }
        None => None,
    };

    // Country is reached through the region chain; no region, no country
    // tier.
    let country = match region.as_ref().map(|r| r.country_id) {
        Some(id) => {
            let found = geo
                .country(id)
                .await
                .map_err(|e| AppError::Unavailable(format!("geo index: {}", e)))?;
            if found.is_none() {
                warn!(
                    "region {} references missing country {}; tier treated as absent",
                    region.as_ref().map(|r| r.id).unwrap_or_default(),
                    id
                );
            }
            found
        }
        None => None,
    };

    Ok(Some(LocationContext {
        closest_city,
        close_cities,
        subregion,
        region,
        country,
    }))
}
