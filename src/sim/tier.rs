//! Progression tiers
//!
//! Seven score-gated stages. The tier index is always derived from the score,
//! so it can only move forward as the score grows.

use serde::Serialize;

/// Passive modifiers unlocked by a tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Abilities {
    /// Collectibles are worth `TIER_BONUS_POINTS` more
    pub score_bonus: bool,
    /// Probability an obstacle hit is negated
    pub shield_chance: f32,
    pub label: &'static str,
}

/// One row of the progression table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tier {
    pub index: usize,
    pub min_score: u64,
    pub abilities: Abilities,
}

const fn row(index: usize, min_score: u64, label: &'static str) -> Tier {
    Tier {
        index,
        min_score,
        abilities: Abilities {
            score_bonus: index >= 2,
            shield_chance: if index >= 3 { 0.30 } else { 0.0 },
            label,
        },
    }
}

pub const TIER_COUNT: usize = 7;

/// Fixed progression table, ascending by `min_score`
pub const TIERS: [Tier; TIER_COUNT] = [
    row(0, 0, "Rookie"),
    row(1, 500, "Runner"),
    row(2, 1200, "Sprinter"),
    row(3, 2200, "Guardian"),
    row(4, 3500, "Champion"),
    row(5, 5000, "Legend"),
    row(6, 7000, "Mythic"),
];

/// Highest tier whose threshold the score has reached
pub fn tier_index_for(score: u64) -> usize {
    TIERS
        .iter()
        .rposition(|t| t.min_score <= score)
        .unwrap_or(0)
}

pub fn tier(index: usize) -> &'static Tier {
    &TIERS[index.min(TIER_COUNT - 1)]
}

/// Points still needed to reach the next tier, `None` at the top tier
pub fn points_to_next_tier(score: u64, index: usize) -> Option<u64> {
    TIERS
        .get(index + 1)
        .map(|next| next.min_score.saturating_sub(score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_is_ascending() {
        for pair in TIERS.windows(2) {
            assert!(pair[0].min_score < pair[1].min_score);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
        assert_eq!(TIERS[0].min_score, 0);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(tier_index_for(0), 0);
        assert_eq!(tier_index_for(499), 0);
        assert_eq!(tier_index_for(500), 1);
        assert_eq!(tier_index_for(1199), 1);
        assert_eq!(tier_index_for(1200), 2);
        assert_eq!(tier_index_for(2200), 3);
        assert_eq!(tier_index_for(3500), 4);
        assert_eq!(tier_index_for(5000), 5);
        assert_eq!(tier_index_for(7000), 6);
        assert_eq!(tier_index_for(u64::MAX), 6);
    }

    #[test]
    fn test_abilities_unlock() {
        assert!(!tier(1).abilities.score_bonus);
        assert!(tier(2).abilities.score_bonus);
        assert_eq!(tier(2).abilities.shield_chance, 0.0);
        assert!((tier(3).abilities.shield_chance - 0.30).abs() < f32::EPSILON);
        assert!(tier(6).abilities.score_bonus);
    }

    #[test]
    fn test_points_to_next_tier() {
        assert_eq!(points_to_next_tier(350, 0), Some(150));
        assert_eq!(points_to_next_tier(7500, 6), None);
    }

    proptest! {
        #[test]
        fn prop_tier_is_monotonic(a in 0u64..20_000, b in 0u64..20_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tier_index_for(lo) <= tier_index_for(hi));
        }

        #[test]
        fn prop_tier_threshold_reached(score in 0u64..20_000) {
            let idx = tier_index_for(score);
            prop_assert!(TIERS[idx].min_score <= score);
            if let Some(next) = TIERS.get(idx + 1) {
                prop_assert!(next.min_score > score);
            }
        }
    }
}
