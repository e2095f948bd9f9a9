//! # gt-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use gt_core::error::AppError;
use gt_core::models::{City, GeoPoint, Tip};
use gt_core::ranking::{RankingConfig, RankingPipeline};
use gt_core::traits::{AuthProvider, GeoIndex, TipStore, UserStore};

use crate::auth::require_user;
use crate::error::{unavailable, ApiError};
use crate::serializers::{city_repr, single_tip, tips_page, Listing};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub geo: Box<dyn GeoIndex>,
    pub tips: Box<dyn TipStore>,
    pub users: Box<dyn UserStore>,
    pub auth: Box<dyn AuthProvider>,
    pub ranking: RankingConfig,
}

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;
const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Kept as raw strings so a malformed value maps to the coordinate
    /// error contract instead of a generic deserialization failure.
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// An area reference in a tip payload. Clients may send richer objects
/// (id plus name, as the city listing returns them); only the id counts.
#[derive(Debug, Deserialize)]
pub struct AreaRef {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TipPayload {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub cities: Vec<AreaRef>,
    #[serde(default)]
    pub subregions: Vec<AreaRef>,
    #[serde(default)]
    pub regions: Vec<AreaRef>,
    #[serde(default)]
    pub countries: Vec<AreaRef>,
}

fn parse_coordinate(name: &str, raw: &str, min: f64, max: f64) -> Result<f64, AppError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidCoordinate(format!("{} {:?} is not a number", name, raw)))?;
    if !value.is_finite() || value < min || value > max {
        return Err(AppError::InvalidCoordinate(format!(
            "{} {} outside [{}, {}]",
            name, value, min, max
        )));
    }
    Ok(value)
}

/// Both coordinates present yield a query point; either one absent takes
/// the no-location path. A present but malformed value is rejected
/// before any ranking work happens.
fn parse_point(query: &ListQuery) -> Result<Option<GeoPoint>, AppError> {
    let latitude = query
        .latitude
        .as_deref()
        .map(|raw| parse_coordinate("latitude", raw, -90.0, 90.0))
        .transpose()?;
    let longitude = query
        .longitude
        .as_deref()
        .map(|raw| parse_coordinate("longitude", raw, -180.0, 180.0))
        .transpose()?;
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon)?)),
        _ => Ok(None),
    }
}

fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (usize, usize) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as usize;
    let offset = offset.unwrap_or(0).max(0) as usize;
    (limit, offset)
}

fn validate_payload(payload: &TipPayload) -> Result<(), AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::ValidationError("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::ValidationError(format!(
            "title longer than {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if payload.text.trim().is_empty() {
        return Err(AppError::ValidationError("text must not be empty".into()));
    }
    Ok(())
}

/// Every tagged area must exist; a typo in an id would otherwise create
/// a tip no location can ever match.
async fn validate_tags(geo: &dyn GeoIndex, payload: &TipPayload) -> Result<(), AppError> {
    for area in &payload.cities {
        if geo.city(area.id).await.map_err(unavailable)?.is_none() {
            return Err(AppError::ValidationError(format!(
                "unknown city id {}",
                area.id
            )));
        }
    }
    for area in &payload.subregions {
        if geo.subregion(area.id).await.map_err(unavailable)?.is_none() {
            return Err(AppError::ValidationError(format!(
                "unknown subregion id {}",
                area.id
            )));
        }
    }
    for area in &payload.regions {
        if geo.region(area.id).await.map_err(unavailable)?.is_none() {
            return Err(AppError::ValidationError(format!(
                "unknown region id {}",
                area.id
            )));
        }
    }
    for area in &payload.countries {
        if geo.country(area.id).await.map_err(unavailable)?.is_none() {
            return Err(AppError::ValidationError(format!(
                "unknown country id {}",
                area.id
            )));
        }
    }
    Ok(())
}

fn area_ids(areas: &[AreaRef]) -> Vec<Uuid> {
    areas.iter().map(|a| a.id).collect()
}

/// The ranked listing. With a query point the order follows the
/// location-relevance boost; without one only global tips appear,
/// ordered by base score.
pub async fn list_tips(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let point = parse_point(&query)?;

    // 1. Rank everything visible from the query point.
    let pipeline = RankingPipeline::new(data.geo.as_ref(), data.tips.as_ref(), data.ranking);
    let ranked = pipeline.query(point).await?;

    // 2. Page the ordered result.
    let count = ranked.len();
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let page: Vec<_> = ranked.into_iter().skip(offset).take(limit).collect();

    // 3. Resolve names and serialize.
    let results = tips_page(data.geo.as_ref(), data.users.as_ref(), &page).await?;
    Ok(HttpResponse::Ok().json(Listing { count, results }))
}

pub async fn get_tip(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let tip = data
        .tips
        .get_tip(id)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| AppError::NotFound("Tip".into(), id.to_string()))?;

    let repr = single_tip(data.geo.as_ref(), data.users.as_ref(), &tip).await?;
    Ok(HttpResponse::Ok().json(repr))
}

/// Orchestrates the submission of a new tip.
pub async fn create_tip(
    data: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<TipPayload>,
) -> Result<HttpResponse, ApiError> {
    // 1. Identity: only registered users may submit.
    let user = require_user(&req, data.users.as_ref()).await?;

    // 2. Validate the payload and its area references.
    validate_payload(&payload)?;
    validate_tags(data.geo.as_ref(), &payload).await?;

    // 3. Persist. The score always starts at zero; votes arrive through
    //    a separate process.
    let tip = Tip {
        id: Uuid::now_v7(),
        owner_id: user.id,
        title: payload.title.trim().to_string(),
        text: payload.text.trim().to_string(),
        score: 0.0,
        cities: area_ids(&payload.cities),
        subregions: area_ids(&payload.subregions),
        regions: area_ids(&payload.regions),
        countries: area_ids(&payload.countries),
        created_at: Utc::now(),
    };
    data.tips.create_tip(&tip).await.map_err(unavailable)?;

    let repr = single_tip(data.geo.as_ref(), data.users.as_ref(), &tip).await?;
    Ok(HttpResponse::Created().json(repr))
}

/// Replaces title, text, and tags. Owner only; the score is not touched.
pub async fn update_tip(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<TipPayload>,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, data.users.as_ref()).await?;
    let id = path.into_inner();

    let mut tip = data
        .tips
        .get_tip(id)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| AppError::NotFound("Tip".into(), id.to_string()))?;
    if tip.owner_id != user.id {
        return Err(AppError::Forbidden("only the owner may edit a tip".into()).into());
    }

    validate_payload(&payload)?;
    validate_tags(data.geo.as_ref(), &payload).await?;

    tip.title = payload.title.trim().to_string();
    tip.text = payload.text.trim().to_string();
    tip.cities = area_ids(&payload.cities);
    tip.subregions = area_ids(&payload.subregions);
    tip.regions = area_ids(&payload.regions);
    tip.countries = area_ids(&payload.countries);
    data.tips.update_tip(&tip).await.map_err(unavailable)?;

    let repr = single_tip(data.geo.as_ref(), data.users.as_ref(), &tip).await?;
    Ok(HttpResponse::Ok().json(repr))
}

pub async fn delete_tip(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, data.users.as_ref()).await?;
    let id = path.into_inner();

    let tip = data
        .tips
        .get_tip(id)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| AppError::NotFound("Tip".into(), id.to_string()))?;
    if tip.owner_id != user.id {
        return Err(AppError::Forbidden("only the owner may delete a tip".into()).into());
    }

    data.tips.delete_tip(id).await.map_err(unavailable)?;
    Ok(HttpResponse::NoContent().finish())
}

/// With a query point: nearby cities annotated with their distance, the
/// same view the tip submission flow reads ids from. Without one: a
/// plain paginated listing.
pub async fn list_cities(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let point = parse_point(&query)?;
    let (limit, offset) = page_bounds(query.limit, query.offset);

    let annotated: Vec<(City, Option<f64>)> = match point {
        Some(p) => data
            .geo
            .query_radius(p, data.ranking.radius_km)
            .await
            .map_err(unavailable)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(city, distance)| (city, Some(distance)))
            .collect(),
        None => data
            .geo
            .list_cities(limit as i64, offset as i64)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(|city| (city, None))
            .collect(),
    };

    let mut results = Vec::with_capacity(annotated.len());
    for (city, distance) in &annotated {
        results.push(city_repr(data.geo.as_ref(), city, *distance).await?);
    }
    Ok(HttpResponse::Ok().json(Listing {
        count: results.len(),
        results,
    }))
}
