//! SQLite-backed [`GeoIndex`].
//!
//! Radius queries run a latitude/longitude bounding-box prefilter in SQL
//! and compute the exact haversine distance in Rust, so the ordering
//! contract (distance ascending, city id as tie-break) does not depend on
//! SQLite arithmetic.

use async_trait::async_trait;
use gt_core::models::{City, Country, GeoPoint, Region, Subregion};
use gt_core::traits::GeoIndex;
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{blob_to_uuid, uuid_to_blob};

/// Kilometres per degree of latitude.
const KM_PER_DEGREE_LAT: f64 = 110.574;
/// Kilometres per degree of longitude at the equator.
const KM_PER_DEGREE_LON: f64 = 111.320;

pub struct SqliteGeoIndex {
    pool: SqlitePool,
}

impl SqliteGeoIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Insert helpers for the seeder and tests; the GeoIndex port itself
    // is read-only.

    pub async fn insert_country(&self, country: &Country) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO countries (id, name) VALUES (?, ?)")
            .bind(uuid_to_blob(country.id))
            .bind(&country.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_region(&self, region: &Region) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO regions (id, name, country_id) VALUES (?, ?, ?)")
            .bind(uuid_to_blob(region.id))
            .bind(&region.name)
            .bind(uuid_to_blob(region.country_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_subregion(&self, subregion: &Subregion) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO subregions (id, name, region_id) VALUES (?, ?, ?)")
            .bind(uuid_to_blob(subregion.id))
            .bind(&subregion.name)
            .bind(uuid_to_blob(subregion.region_id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_city(&self, city: &City) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO cities (id, name, latitude, longitude, subregion_id, region_id, country_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(city.id))
        .bind(&city.name)
        .bind(city.location.latitude)
        .bind(city.location.longitude)
        .bind(city.subregion_id.map(uuid_to_blob))
        .bind(city.region_id.map(uuid_to_blob))
        .bind(city.country_id.map(uuid_to_blob))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn city_from_row(row: &SqliteRow) -> City {
    City {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        name: row.get("name"),
        location: GeoPoint {
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        },
        subregion_id: row
            .get::<Option<Vec<u8>>, _>("subregion_id")
            .map(|b| blob_to_uuid(&b)),
        region_id: row
            .get::<Option<Vec<u8>>, _>("region_id")
            .map(|b| blob_to_uuid(&b)),
        country_id: row
            .get::<Option<Vec<u8>>, _>("country_id")
            .map(|b| blob_to_uuid(&b)),
    }
}

/// Longitude window for the bounding box, or `None` when the band cannot
/// be narrowed (polar latitudes, or a window that would wrap the
/// antimeridian).
fn lon_window(point: GeoPoint, radius_km: f64) -> Option<(f64, f64)> {
    let cos_lat = point.latitude.to_radians().cos();
    if cos_lat < 1e-6 {
        return None;
    }
    let delta = radius_km / (KM_PER_DEGREE_LON * cos_lat);
    let (min, max) = (point.longitude - delta, point.longitude + delta);
    if min < -180.0 || max > 180.0 {
        return None;
    }
    Some((min, max))
}

#[async_trait]
impl GeoIndex for SqliteGeoIndex {
    async fn query_radius(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> anyhow::Result<Vec<(City, f64)>> {
        let lat_delta = radius_km / KM_PER_DEGREE_LAT;
        let lat_min = point.latitude - lat_delta;
        let lat_max = point.latitude + lat_delta;

        let rows = match lon_window(point, radius_km) {
            Some((lon_min, lon_max)) => {
                sqlx::query(
                    "SELECT id, name, latitude, longitude, subregion_id, region_id, country_id
                     FROM cities
                     WHERE latitude BETWEEN ? AND ? AND longitude BETWEEN ? AND ?",
                )
                .bind(lat_min)
                .bind(lat_max)
                .bind(lon_min)
                .bind(lon_max)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, name, latitude, longitude, subregion_id, region_id, country_id
                     FROM cities
                     WHERE latitude BETWEEN ? AND ?",
                )
                .bind(lat_min)
                .bind(lat_max)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut hits: Vec<(City, f64)> = rows
            .iter()
            .map(city_from_row)
            .map(|city| {
                let distance = city.location.distance_km(&point);
                (city, distance)
            })
            .filter(|(_, distance)| *distance <= radius_km)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        Ok(hits)
    }

    async fn city(&self, id: Uuid) -> anyhow::Result<Option<City>> {
        let row = sqlx::query(
            "SELECT id, name, latitude, longitude, subregion_id, region_id, country_id
             FROM cities WHERE id = ?",
        )
        .bind(uuid_to_blob(id))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(city_from_row))
    }

    async fn subregion(&self, id: Uuid) -> anyhow::Result<Option<Subregion>> {
        let row = sqlx::query("SELECT id, name, region_id FROM subregions WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| Subregion {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            name: row.get("name"),
            region_id: blob_to_uuid(row.get::<Vec<u8>, _>("region_id").as_slice()),
        }))
    }

    async fn region(&self, id: Uuid) -> anyhow::Result<Option<Region>> {
        let row = sqlx::query("SELECT id, name, country_id FROM regions WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| Region {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            name: row.get("name"),
            country_id: blob_to_uuid(row.get::<Vec<u8>, _>("country_id").as_slice()),
        }))
    }

    async fn country(&self, id: Uuid) -> anyhow::Result<Option<Country>> {
        let row = sqlx::query("SELECT id, name FROM countries WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| Country {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            name: row.get("name"),
        }))
    }

    async fn list_cities(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<City>> {
        let rows = sqlx::query(
            "SELECT id, name, latitude, longitude, subregion_id, region_id, country_id
             FROM cities ORDER BY name, id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(city_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pool;

    fn city(name: &str, lat: f64, lon: f64) -> City {
        City {
            id: Uuid::now_v7(),
            name: name.to_string(),
            location: GeoPoint {
                latitude: lat,
                longitude: lon,
            },
            subregion_id: None,
            region_id: None,
            country_id: None,
        }
    }

    #[tokio::test]
    async fn radius_query_orders_by_distance() {
        let index = SqliteGeoIndex::new(test_pool().await);

        let near = city("Near", 45.0, 7.0);
        let mid = city("Mid", 45.03, 7.0);
        let outside = city("Outside", 46.0, 7.0);
        for c in [&near, &mid, &outside] {
            index.insert_city(c).await.unwrap();
        }

        let point = GeoPoint::new(45.0, 7.0).unwrap();
        let hits = index.query_radius(point, 10.0).await.unwrap();

        let ids: Vec<Uuid> = hits.iter().map(|(c, _)| c.id).collect();
        assert_eq!(ids, vec![near.id, mid.id]);
        assert!(hits[0].1 < hits[1].1);
        // Roughly 3.3 km for 0.03 degrees of latitude.
        assert!((hits[1].1 - 3.3).abs() < 0.2, "got {}", hits[1].1);
    }

    #[tokio::test]
    async fn radius_query_empty_is_not_an_error() {
        let index = SqliteGeoIndex::new(test_pool().await);
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        let hits = index.query_radius(point, 10.0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn bounding_box_does_not_cut_off_diagonal_neighbors() {
        let index = SqliteGeoIndex::new(test_pool().await);
        let diagonal = city("Diagonal", 45.04, 7.07);
        index.insert_city(&diagonal).await.unwrap();

        let point = GeoPoint::new(45.0, 7.0).unwrap();
        let hits = index.query_radius(point, 10.0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn hierarchy_roundtrip() {
        let pool = test_pool().await;
        let index = SqliteGeoIndex::new(pool);

        let country = Country {
            id: Uuid::now_v7(),
            name: "Freedonia".into(),
        };
        let region = Region {
            id: Uuid::now_v7(),
            name: "Northern Province".into(),
            country_id: country.id,
        };
        let subregion = Subregion {
            id: Uuid::now_v7(),
            name: "Capital District".into(),
            region_id: region.id,
        };
        let mut c = city("Fredville", 45.0, 7.0);
        c.subregion_id = Some(subregion.id);
        c.region_id = Some(region.id);
        c.country_id = Some(country.id);

        index.insert_country(&country).await.unwrap();
        index.insert_region(&region).await.unwrap();
        index.insert_subregion(&subregion).await.unwrap();
        index.insert_city(&c).await.unwrap();

        let loaded = index.city(c.id).await.unwrap().unwrap();
        assert_eq!(loaded.subregion_id, Some(subregion.id));
        assert_eq!(loaded.region_id, Some(region.id));
        assert_eq!(loaded.country_id, Some(country.id));

        assert_eq!(
            index.region(region.id).await.unwrap().unwrap().country_id,
            country.id
        );
        assert_eq!(
            index.country(country.id).await.unwrap().unwrap().name,
            "Freedonia"
        );
    }
}
