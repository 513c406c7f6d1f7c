//! Entity spawner
//!
//! Spawns one entity whenever the spawn interval has elapsed. The interval
//! tightens with score, then eases off past `SPAWN_KNEE_SCORE` so high scores
//! stay playable.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{CollectibleKind, EntityKind, GameState, ObstacleKind};
use super::tier::points_to_next_tier;
use crate::consts::*;

pub const OBSTACLE_CHANCE: f64 = 0.4;
pub const BONUS_BASE_CHANCE: f64 = 0.005;
/// Added to the bonus chance while the catch-up mechanic is active
pub const CATCH_UP_BONUS: f64 = 0.3;
/// Catch-up applies when the next tier is at most this many points away
pub const CATCH_UP_RANGE: u64 = 200;
/// Catch-up stops after this many bonus spawns within one tier
pub const CATCH_UP_CAP: u32 = 3;

/// Spawn timer and per-tier catch-up bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawner {
    pub last_spawn_frame: u64,
    /// Bonus collectibles spawned since entering the current tier
    pub bonus_spawns_in_tier: u32,
}

/// Frames between spawns at `score`
pub fn spawn_interval(score: u64) -> u64 {
    if score < SPAWN_KNEE_SCORE {
        BASE_SPAWN_INTERVAL
            .saturating_sub(score / 50)
            .max(SPAWN_INTERVAL_FLOOR)
    } else {
        let knee = BASE_SPAWN_INTERVAL
            .saturating_sub(SPAWN_KNEE_SCORE / 50)
            .max(SPAWN_INTERVAL_FLOOR);
        let extra = (score - SPAWN_KNEE_SCORE) / 200;
        knee.saturating_sub(extra).max(SPAWN_INTERVAL_LATE_FLOOR)
    }
}

/// Pick from a weight table with a roll in `[0, 1)`
pub fn pick_weighted<T: Copy>(table: &[(T, f32)], roll: f32) -> T {
    let mut acc = 0.0;
    for &(item, weight) in table {
        acc += weight;
        if roll < acc {
            return item;
        }
    }
    // Rounding in the accumulated weights can leave a sliver above the last bucket
    table[table.len() - 1].0
}

/// Probability that a collectible spawn is the bonus subkind
pub fn bonus_chance(score: u64, tier_index: usize, bonus_spawns_in_tier: u32) -> f64 {
    let near_next_tier =
        points_to_next_tier(score, tier_index).is_some_and(|gap| gap <= CATCH_UP_RANGE);
    if near_next_tier && bonus_spawns_in_tier < CATCH_UP_CAP {
        BONUS_BASE_CHANCE + CATCH_UP_BONUS
    } else {
        BONUS_BASE_CHANCE
    }
}

/// Roll a kind and subkind for a new entity
pub fn roll_kind(state: &mut GameState) -> EntityKind {
    if state.rng.random_bool(OBSTACLE_CHANCE) {
        let roll: f32 = state.rng.random();
        return EntityKind::Obstacle(pick_weighted(&ObstacleKind::WEIGHTED, roll));
    }

    let chance = bonus_chance(
        state.player.score,
        state.player.tier_index,
        state.spawner.bonus_spawns_in_tier,
    );
    if state.rng.random_bool(chance) {
        state.spawner.bonus_spawns_in_tier += 1;
        return EntityKind::Collectible(CollectibleKind::Heart);
    }

    let roll: f32 = state.rng.random();
    EntityKind::Collectible(pick_weighted(&CollectibleKind::WEIGHTED, roll))
}

/// Spawn an entity if the interval has elapsed. Returns the new id.
pub fn maybe_spawn(state: &mut GameState) -> Option<u32> {
    let frame = state.clock.frame;
    let interval = spawn_interval(state.player.score);
    if state.clock.elapsed_since(state.spawner.last_spawn_frame) <= interval {
        return None;
    }

    let kind = roll_kind(state);
    let x = state.rng.random_range(0.0..=FIELD_WIDTH - ENTITY_SIZE);
    state.spawner.last_spawn_frame = frame;
    let id = state.spawn_entity(kind, x);
    log::trace!("spawned {:?} #{} at x={:.1} (interval {})", kind, id, x, interval);
    Some(id)
}
