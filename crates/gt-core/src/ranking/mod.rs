//! # Ranking Core
//!
//! The location-relevance pipeline: resolve the query point to a
//! [`LocationContext`], select the candidate tips visible from it, and
//! order them by boost score. Each stage is a pure function of the
//! collaborator snapshots it is handed, so the pipeline can run
//! concurrently for independent requests without any shared state beyond
//! its configuration.

pub mod ranker;
pub mod resolver;
pub mod selector;

use crate::error::Result;
use crate::models::{GeoPoint, RankedTip};
use crate::traits::{GeoIndex, TipStore};

/// Tuning knobs for the ranking pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RankingConfig {
    /// Search radius for nearby cities, in kilometres.
    pub radius_km: f64,
    /// Upper bound on resolved cities, the closest city included.
    pub max_cities: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            radius_km: 10.0,
            max_cities: 10,
        }
    }
}

/// Wires resolver, selector, and ranker against the collaborator ports.
pub struct RankingPipeline<'a> {
    geo: &'a dyn GeoIndex,
    tips: &'a dyn TipStore,
    config: RankingConfig,
}

impl<'a> RankingPipeline<'a> {
    pub fn new(geo: &'a dyn GeoIndex, tips: &'a dyn TipStore, config: RankingConfig) -> Self {
        Self { geo, tips, config }
    }

    /// Runs the full pipeline for one query point. `None` takes the
    /// no-location path: global tips only, ordered by base score.
    pub async fn query(&self, point: Option<GeoPoint>) -> Result<Vec<RankedTip>> {
        // 1. Resolve the point to a location context, if any.
        let context = match point {
            Some(p) => {
                resolver::resolve(self.geo, p, self.config.radius_km, self.config.max_cities)
                    .await?
            }
            None => None,
        };

        // 2. Collect the candidate set with per-tier match flags.
        let candidates = selector::select(self.tips, context.as_ref()).await?;

        // 3. Order by boost score; pure computation from here on.
        Ok(ranker::rank(candidates, context.is_some()))
    }
}
