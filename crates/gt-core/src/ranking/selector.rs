//! Candidate-set construction.
//!
//! Global tips are always eligible. With a resolved location, tips tagged
//! at any tier of the context join them (set-union semantics). A tip
//! matching several tiers appears exactly once in the output, with every
//! matching tier recorded so the ranker can stack the bonuses.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{LocationContext, TierMatches, Tip};
use crate::traits::TipStore;

/// Selects the tips visible from `context`, each paired with its
/// tier-match flags. Without a context only global tips are visible.
pub async fn select(
    store: &dyn TipStore,
    context: Option<&LocationContext>,
) -> Result<Vec<(Tip, TierMatches)>> {
    let global = store
        .list_global_tips()
        .await
        .map_err(|e| AppError::Unavailable(format!("tip store: {}", e)))?;

    let context = match context {
        Some(ctx) => ctx,
        None => {
            return Ok(global
                .into_iter()
                .map(|t| (t, TierMatches::default()))
                .collect())
        }
    };

    let mut city_ids: Vec<Uuid> = vec![context.closest_city.id];
    city_ids.extend(context.close_cities.iter().map(|c| c.id));
    let subregion_ids: Vec<Uuid> = context.subregion.iter().map(|s| s.id).collect();
    let region_ids: Vec<Uuid> = context.region.iter().map(|r| r.id).collect();
    let country_ids: Vec<Uuid> = context.country.iter().map(|c| c.id).collect();

    let local = store
        .find_by_tag_membership(&city_ids, &subregion_ids, &region_ids, &country_ids)
        .await
        .map_err(|e| AppError::Unavailable(format!("tip store: {}", e)))?;

    // Union, deduplicated by tip identity. Flags are recomputed from the
    // tip's own tag sets so overlapping matches collapse into one entry
    // without losing tier information.
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for tip in global.into_iter().chain(local) {
        if !seen.insert(tip.id) {
            continue;
        }
        let matches = match_tiers(&tip, context);
        candidates.push((tip, matches));
    }
    Ok(candidates)
}

/// Checks the tip's tag sets against the context, one flag per tier.
/// Flags are independent; a tip tagged with both the closest city and its
/// region lights up both.
fn match_tiers(tip: &Tip, context: &LocationContext) -> TierMatches {
    TierMatches {
        closest_city: tip.cities.contains(&context.closest_city.id),
        close_cities: context
            .close_cities
            .iter()
            .any(|c| tip.cities.contains(&c.id)),
        subregion: context
            .subregion
            .as_ref()
            .map_or(false, |s| tip.subregions.contains(&s.id)),
        region: context
            .region
            .as_ref()
            .map_or(false, |r| tip.regions.contains(&r.id)),
        country: context
            .country
            .as_ref()
            .map_or(false, |c| tip.countries.contains(&c.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Country, Region};
    use crate::ranking::test_support::{city, tip, InMemoryTipStore};

    fn context() -> LocationContext {
        let country = Country {
            id: Uuid::now_v7(),
            name: "Freedonia".into(),
        };
        let region = Region {
            id: Uuid::now_v7(),
            name: "Northern Province".into(),
            country_id: country.id,
        };
        LocationContext {
            closest_city: city("Fredville", 45.0, 7.0),
            close_cities: vec![city("Portside", 45.045, 7.0)],
            subregion: None,
            region: Some(region),
            country: Some(country),
        }
    }

    #[tokio::test]
    async fn no_context_yields_global_tips_only() {
        let mut country_tagged = tip("country only", 0.0);
        country_tagged.countries.push(Uuid::now_v7());
        let global = tip("global", 0.0);

        let store = InMemoryTipStore::with_tips(vec![country_tagged, global.clone()]);
        let selected = select(&store, None).await.unwrap();

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, global.id);
        assert_eq!(selected[0].1, TierMatches::default());
    }

    /// A tip tagged only at the country tier must never ride in on the
    /// global set, even though its other three tag sets are empty.
    #[tokio::test]
    async fn globality_is_conjunctive_in_selection() {
        let ctx = context();
        let mut foreign_country = tip("foreign country only", 0.0);
        foreign_country.countries.push(Uuid::now_v7());

        let store = InMemoryTipStore::with_tips(vec![foreign_country]);
        let selected = select(&store, Some(&ctx)).await.unwrap();
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn union_deduplicates_and_keeps_all_flags() {
        let ctx = context();
        let mut multi = tip("city and region", 0.0);
        multi.cities.push(ctx.closest_city.id);
        multi.regions.push(ctx.region.as_ref().unwrap().id);

        let store = InMemoryTipStore::with_tips(vec![multi.clone()]);
        let selected = select(&store, Some(&ctx)).await.unwrap();

        assert_eq!(selected.len(), 1);
        let (found, matches) = &selected[0];
        assert_eq!(found.id, multi.id);
        assert!(matches.closest_city);
        assert!(matches.region);
        assert!(!matches.close_cities);
        assert!(!matches.subregion);
        assert!(!matches.country);
    }

    #[tokio::test]
    async fn close_city_and_closest_city_flags_are_distinct() {
        let ctx = context();
        let mut near = tip("close city", 0.0);
        near.cities.push(ctx.close_cities[0].id);

        let store = InMemoryTipStore::with_tips(vec![near]);
        let selected = select(&store, Some(&ctx)).await.unwrap();

        let (_, matches) = &selected[0];
        assert!(!matches.closest_city);
        assert!(matches.close_cities);
    }

    #[tokio::test]
    async fn global_tips_ride_along_with_local_results() {
        let ctx = context();
        let global = tip("global", 3.0);
        let mut local = tip("local", 0.0);
        local.cities.push(ctx.closest_city.id);

        let store = InMemoryTipStore::with_tips(vec![global.clone(), local.clone()]);
        let mut selected = select(&store, Some(&ctx)).await.unwrap();
        selected.sort_by_key(|(t, _)| t.id);

        let mut expected = vec![global.id, local.id];
        expected.sort();
        let got: Vec<Uuid> = selected.iter().map(|(t, _)| t.id).collect();
        assert_eq!(got, expected);
    }

    /// Absent tiers can never match, whatever the tip is tagged with.
    #[tokio::test]
    async fn absent_tier_never_matches() {
        let mut ctx = context();
        ctx.region = None;
        ctx.country = None;

        let mut region_tagged = tip("region tagged", 0.0);
        region_tagged.regions.push(Uuid::now_v7());

        let store = InMemoryTipStore::with_tips(vec![region_tagged]);
        let selected = select(&store, Some(&ctx)).await.unwrap();
        assert!(selected.is_empty());
    }
}
