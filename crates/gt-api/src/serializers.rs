//! Response shapes.
//!
//! Listings use a `{count, results}` envelope. Tip representations
//! carry resolved area names rather than raw ids; cities nest their
//! subregion, region, and country so a client can build a tagged tip
//! from one `/cities/` response.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use gt_core::error::Result;
use gt_core::models::{City, RankedTip, Tip};
use gt_core::traits::{GeoIndex, UserStore};

use crate::error::unavailable;

#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub count: usize,
    pub results: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct TipRepr {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    /// Username of the owner; `None` when the account no longer exists.
    pub tipper: Option<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_score: Option<f64>,
    pub cities: Vec<String>,
    pub subregions: Vec<String>,
    pub regions: Vec<String>,
    pub countries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CountryRepr {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegionRepr {
    pub id: Uuid,
    pub name: String,
    pub country: Option<CountryRepr>,
}

#[derive(Debug, Serialize)]
pub struct SubregionRepr {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CityRepr {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub subregion: Option<SubregionRepr>,
    pub region: Option<RegionRepr>,
}

/// Per-request cache of area and owner names. Tips on one page share
/// most of their tags, so each id hits the index at most once. A tag id
/// that no longer resolves is dropped from the output rather than
/// failing the request.
struct NameCache<'a> {
    geo: &'a dyn GeoIndex,
    users: &'a dyn UserStore,
    cities: HashMap<Uuid, Option<String>>,
    subregions: HashMap<Uuid, Option<String>>,
    regions: HashMap<Uuid, Option<String>>,
    countries: HashMap<Uuid, Option<String>>,
    usernames: HashMap<Uuid, Option<String>>,
}

impl<'a> NameCache<'a> {
    fn new(geo: &'a dyn GeoIndex, users: &'a dyn UserStore) -> Self {
        Self {
            geo,
            users,
            cities: HashMap::new(),
            subregions: HashMap::new(),
            regions: HashMap::new(),
            countries: HashMap::new(),
            usernames: HashMap::new(),
        }
    }

    async fn city_name(&mut self, id: Uuid) -> Result<Option<String>> {
        if let Some(cached) = self.cities.get(&id) {
            return Ok(cached.clone());
        }
        let name = self
            .geo
            .city(id)
            .await
            .map_err(unavailable)?
            .map(|c| c.name);
        self.cities.insert(id, name.clone());
        Ok(name)
    }

    async fn subregion_name(&mut self, id: Uuid) -> Result<Option<String>> {
        if let Some(cached) = self.subregions.get(&id) {
            return Ok(cached.clone());
        }
        let name = self
            .geo
            .subregion(id)
            .await
            .map_err(unavailable)?
            .map(|s| s.name);
        self.subregions.insert(id, name.clone());
        Ok(name)
    }

    async fn region_name(&mut self, id: Uuid) -> Result<Option<String>> {
        if let Some(cached) = self.regions.get(&id) {
            return Ok(cached.clone());
        }
        let name = self
            .geo
            .region(id)
            .await
            .map_err(unavailable)?
            .map(|r| r.name);
        self.regions.insert(id, name.clone());
        Ok(name)
    }

    async fn country_name(&mut self, id: Uuid) -> Result<Option<String>> {
        if let Some(cached) = self.countries.get(&id) {
            return Ok(cached.clone());
        }
        let name = self
            .geo
            .country(id)
            .await
            .map_err(unavailable)?
            .map(|c| c.name);
        self.countries.insert(id, name.clone());
        Ok(name)
    }

    async fn username(&mut self, id: Uuid) -> Result<Option<String>> {
        if let Some(cached) = self.usernames.get(&id) {
            return Ok(cached.clone());
        }
        let name = self
            .users
            .find_by_id(id)
            .await
            .map_err(unavailable)?
            .map(|u| u.username);
        self.usernames.insert(id, name.clone());
        Ok(name)
    }

    async fn tip_repr(&mut self, tip: &Tip, boost_score: Option<f64>) -> Result<TipRepr> {
        let mut cities = Vec::with_capacity(tip.cities.len());
        for id in &tip.cities {
            if let Some(name) = self.city_name(*id).await? {
                cities.push(name);
            }
        }
        let mut subregions = Vec::with_capacity(tip.subregions.len());
        for id in &tip.subregions {
            if let Some(name) = self.subregion_name(*id).await? {
                subregions.push(name);
            }
        }
        let mut regions = Vec::with_capacity(tip.regions.len());
        for id in &tip.regions {
            if let Some(name) = self.region_name(*id).await? {
                regions.push(name);
            }
        }
        let mut countries = Vec::with_capacity(tip.countries.len());
        for id in &tip.countries {
            if let Some(name) = self.country_name(*id).await? {
                countries.push(name);
            }
        }

        Ok(TipRepr {
            id: tip.id,
            title: tip.title.clone(),
            text: tip.text.clone(),
            tipper: self.username(tip.owner_id).await?,
            score: tip.score,
            boost_score,
            cities,
            subregions,
            regions,
            countries,
        })
    }
}

/// Serializes one page of ranked tips, preserving their order. On the
/// no-location path the boost equals the base score, so the annotation
/// is carried either way.
pub async fn tips_page(
    geo: &dyn GeoIndex,
    users: &dyn UserStore,
    page: &[RankedTip],
) -> Result<Vec<TipRepr>> {
    let mut cache = NameCache::new(geo, users);
    let mut results = Vec::with_capacity(page.len());
    for ranked in page {
        results.push(cache.tip_repr(&ranked.tip, Some(ranked.boost_score)).await?);
    }
    Ok(results)
}

/// Serializes a single tip outside any ranking context.
pub async fn single_tip(geo: &dyn GeoIndex, users: &dyn UserStore, tip: &Tip) -> Result<TipRepr> {
    let mut cache = NameCache::new(geo, users);
    cache.tip_repr(tip, None).await
}

/// Serializes a city with its parent chain resolved to nested names.
pub async fn city_repr(
    geo: &dyn GeoIndex,
    city: &City,
    distance_km: Option<f64>,
) -> Result<CityRepr> {
    let subregion = match city.subregion_id {
        Some(id) => geo.subregion(id).await.map_err(unavailable)?,
        None => None,
    };
    let region_id = city
        .region_id
        .or_else(|| subregion.as_ref().map(|s| s.region_id));
    let region = match region_id {
        Some(id) => geo.region(id).await.map_err(unavailable)?,
        None => None,
    };
    let country_id = region.as_ref().map(|r| r.country_id).or(city.country_id);
    let country = match country_id {
        Some(id) => geo.country(id).await.map_err(unavailable)?,
        None => None,
    };

    Ok(CityRepr {
        id: city.id,
        name: city.name.clone(),
        latitude: city.location.latitude,
        longitude: city.location.longitude,
        distance_km,
        subregion: subregion.map(|s| SubregionRepr {
            id: s.id,
            name: s.name,
        }),
        region: region.map(|r| RegionRepr {
            id: r.id,
            name: r.name,
            country: country.map(|c| CountryRepr {
                id: c.id,
                name: c.name,
            }),
        }),
    })
}
