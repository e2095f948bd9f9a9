//! Boost-score computation and ordering.
//!
//! Five additive terms, one per tier. A matched tier contributes
//! `(base_score + 1) * weight`; the `+ 1` keeps a zero-score tip from
//! losing its tier bonus entirely, so a brand-new local tip still ranks
//! above unrelated material. Terms stack when a tip matches several
//! tiers. Without a location context the boost equals the base score and
//! global tips are never promoted past it.

use crate::models::{RankedTip, TierMatches, Tip};

const CLOSEST_CITY_WEIGHT: f64 = 200.0;
const CLOSE_CITIES_WEIGHT: f64 = 100.0;
const SUBREGION_WEIGHT: f64 = 50.0;
const REGION_WEIGHT: f64 = 20.0;
const COUNTRY_WEIGHT: f64 = 10.0;

/// Orders candidates by boost score descending, tip id ascending on
/// ties. The ordering is total: identical queries against identical
/// snapshots always produce identical output.
pub fn rank(candidates: Vec<(Tip, TierMatches)>, has_context: bool) -> Vec<RankedTip> {
    let mut ranked: Vec<RankedTip> = candidates
        .into_iter()
        .map(|(tip, matches)| {
            let boost_score = if has_context {
                boost(&tip, matches)
            } else {
                tip.score
            };
            RankedTip { tip, boost_score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.boost_score
            .total_cmp(&a.boost_score)
            .then_with(|| a.tip.id.cmp(&b.tip.id))
    });
    ranked
}

fn boost(tip: &Tip, matches: TierMatches) -> f64 {
    let bonus = tip.score + 1.0;
    let mut score = tip.score;
    if matches.closest_city {
        score += bonus * CLOSEST_CITY_WEIGHT;
    }
    if matches.close_cities {
        score += bonus * CLOSE_CITIES_WEIGHT;
    }
    if matches.subregion {
        score += bonus * SUBREGION_WEIGHT;
    }
    if matches.region {
        score += bonus * REGION_WEIGHT;
    }
    if matches.country {
        score += bonus * COUNTRY_WEIGHT;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::test_support::tip;
    use uuid::Uuid;

    fn only(flag: &str) -> TierMatches {
        TierMatches {
            closest_city: flag == "closest_city",
            close_cities: flag == "close_cities",
            subregion: flag == "subregion",
            region: flag == "region",
            country: flag == "country",
        }
    }

    #[test]
    fn no_context_orders_by_base_score_then_id() {
        let a = tip("a", 2.0);
        let b = tip("b", 5.0);
        let c = tip("c", 2.0);

        let ranked = rank(
            vec![
                (a.clone(), TierMatches::default()),
                (b.clone(), TierMatches::default()),
                (c.clone(), TierMatches::default()),
            ],
            false,
        );

        let order: Vec<Uuid> = ranked.iter().map(|r| r.tip.id).collect();
        // b first on score; the tied pair falls back to id ascending.
        let mut tied = vec![a.id, c.id];
        tied.sort();
        assert_eq!(order, vec![b.id, tied[0], tied[1]]);
        assert!(ranked.iter().all(|r| r.boost_score == r.tip.score));
    }

    /// Closest-city weight (200) strictly dominates country weight (10)
    /// at equal base score.
    #[test]
    fn tier_weighting_is_monotonic() {
        let city_tip = tip("city", 1.0);
        let country_tip = tip("country", 1.0);

        let ranked = rank(
            vec![
                (country_tip.clone(), only("country")),
                (city_tip.clone(), only("closest_city")),
            ],
            true,
        );

        assert_eq!(ranked[0].tip.id, city_tip.id);
        assert!(ranked[0].boost_score > ranked[1].boost_score);
    }

    #[test]
    fn weights_follow_the_tier_ladder() {
        let flags = [
            "closest_city",
            "close_cities",
            "subregion",
            "region",
            "country",
        ];
        let boosts: Vec<f64> = flags
            .iter()
            .map(|f| rank(vec![(tip("t", 0.0), only(f))], true)[0].boost_score)
            .collect();
        assert_eq!(boosts, vec![200.0, 100.0, 50.0, 20.0, 10.0]);
    }

    /// boost = base + (base+1)*200 + (base+1)*20 for a city+region match.
    #[test]
    fn terms_stack_additively() {
        let base = 3.0;
        let t = tip("stacked", base);
        let matches = TierMatches {
            closest_city: true,
            region: true,
            ..Default::default()
        };

        let city_only = rank(vec![(t.clone(), only("closest_city"))], true)[0].boost_score;
        let stacked = rank(vec![(t, matches)], true)[0].boost_score;

        assert_eq!(stacked, base + (base + 1.0) * 200.0 + (base + 1.0) * 20.0);
        assert!(stacked > city_only);
    }

    /// The +1 offset guarantees a zero-score tip still earns its tier
    /// bonus.
    #[test]
    fn zero_score_tip_keeps_its_tier_bonus() {
        let t = tip("fresh", 0.0);
        let ranked = rank(vec![(t, only("closest_city"))], true);
        assert_eq!(ranked[0].boost_score, 200.0);
    }

    #[test]
    fn global_tips_are_never_promoted() {
        let global = tip("global", 5.0);
        let ranked = rank(vec![(global, TierMatches::default())], true);
        assert_eq!(ranked[0].boost_score, 5.0);
    }

    #[test]
    fn empty_candidate_set_is_fine() {
        assert!(rank(vec![], true).is_empty());
        assert!(rank(vec![], false).is_empty());
    }

    #[test]
    fn equal_boosts_tie_break_on_id_ascending() {
        let a = tip("a", 0.0);
        let b = tip("b", 0.0);
        // Same flags, same score: ordering falls back to id.
        let ranked = rank(
            vec![(b.clone(), only("region")), (a.clone(), only("region"))],
            true,
        );
        let order: Vec<Uuid> = ranked.iter().map(|r| r.tip.id).collect();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(order, expected);
    }
}
