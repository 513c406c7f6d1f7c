//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame-counted time only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod clock;
pub mod collision;
pub mod particles;
pub mod player;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod tier;

pub use clock::SimClock;
pub use collision::{Aabb, entity_box, player_box};
pub use particles::{EffectPose, ParticleEffect, ParticleKind, ParticleSet};
pub use player::{GestureCell, GestureSample, PlayerController, Spring};
pub use spawn::{Spawner, spawn_interval};
pub use state::{
    Banner, CollectibleKind, Entity, EntityKind, GameEvent, GamePhase, GameState, ObstacleKind,
    PlayerState,
};
pub use tick::{TickInput, next_run_seed, tick};
pub use tier::{TIERS, Tier, tier_index_for};
