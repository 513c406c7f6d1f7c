//! Game state and core simulation types
//!
//! Everything the tick mutates lives in `GameState`, which is owned by one driver.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::SimClock;
use super::particles::ParticleSet;
use super::player::PlayerController;
use super::spawn::Spawner;
use crate::consts::*;
use crate::feedback::{FeedbackArbitrator, FeedbackCommand, FeedbackEvent};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Constructed, waiting for start
    Idle,
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Run ended, waiting for restart or exit
    GameOver,
    /// Left the minigame; terminal
    Exited,
}

/// Obstacle variants and their spawn weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    Rock,
    Spike,
    /// Has a dedicated rare hit cue
    Bomb,
}

impl ObstacleKind {
    pub const WEIGHTED: [(ObstacleKind, f32); 3] = [
        (ObstacleKind::Rock, 0.5),
        (ObstacleKind::Spike, 0.3),
        (ObstacleKind::Bomb, 0.2),
    ];
}

/// Collectible variants. `Heart` is the rare bonus subkind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleKind {
    Coin,
    Gem,
    Star,
    Heart,
}

impl CollectibleKind {
    /// Common subkinds only; the bonus subkind is rolled separately
    pub const WEIGHTED: [(CollectibleKind, f32); 3] = [
        (CollectibleKind::Coin, 0.5),
        (CollectibleKind::Gem, 0.3),
        (CollectibleKind::Star, 0.2),
    ];

    pub fn is_bonus(self) -> bool {
        self == CollectibleKind::Heart
    }
}

/// What a falling entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle(ObstacleKind),
    Collectible(CollectibleKind),
}

/// A falling entity. Its height is derived from the clock, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    /// Left edge, fixed at spawn
    pub x: f32,
    pub spawn_frame: u64,
    /// Pixels per frame, fixed at spawn
    pub speed: f32,
}

impl Entity {
    /// Top edge at `frame`: starts one entity height above the field
    pub fn y_at(&self, frame: u64) -> f32 {
        -ENTITY_SIZE + frame.saturating_sub(self.spawn_frame) as f32 * self.speed
    }

    /// Whether the entity has fallen past the bottom of the field
    pub fn has_exited(&self, frame: u64) -> bool {
        self.y_at(frame) > FIELD_HEIGHT
    }
}

/// Per-session player values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    /// Degrees, within ±`MAX_TILT_DEGREES`
    pub tilt: f32,
    pub lives: u32,
    pub score: u64,
    pub tier_index: usize,
}

/// Default player position: horizontally centred, resting above the gesture bar
pub const PLAYER_START_X: f32 = (FIELD_WIDTH - PLAYER_SIZE) / 2.0;
pub const PLAYER_START_Y: f32 = FIELD_HEIGHT - PLAYER_SIZE - MARGIN_BOTTOM - 40.0;

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            x: PLAYER_START_X,
            y: PLAYER_START_Y,
            tilt: 0.0,
            lives: STARTING_LIVES,
            score: 0,
            tier_index: 0,
        }
    }
}

/// Level-up announcement shown for a fixed number of frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub label: String,
    pub expires_at: u64,
}

/// Things that happened during a tick, drained by the session driver
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Feedback(FeedbackEvent),
    /// Lives reached zero; carries the values submitted to the score store
    GameOver { score: u64, tier_label: &'static str },
}

/// Complete simulation state (deterministic given seed and inputs)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Gameplay RNG; visual jitter never draws from it
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub clock: SimClock,
    pub player: PlayerState,
    pub controller: PlayerController,
    /// Active entities (sorted by id for determinism)
    pub entities: Vec<Entity>,
    pub spawner: Spawner,
    /// Speed handed to newly spawned entities
    pub entity_speed: f32,
    pub particles: ParticleSet,
    pub feedback: FeedbackArbitrator,
    pub banner: Option<Banner>,
    /// 0-1 shake intensity for the presentation layer
    pub screen_shake: f32,
    /// Events emitted since the driver last drained them
    pub events: Vec<GameEvent>,
    /// Playback commands waiting for the feedback worker
    pub commands: Vec<FeedbackCommand>,
    next_id: u32,
}

impl GameState {
    /// Create a new idle game state with the given seed
    pub fn new(seed: u64) -> Self {
        let player = PlayerState::default();
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Idle,
            clock: SimClock::default(),
            controller: PlayerController::new(player.x, player.y),
            player,
            entities: Vec::new(),
            spawner: Spawner::default(),
            entity_speed: BASE_ENTITY_SPEED,
            particles: ParticleSet::default(),
            feedback: FeedbackArbitrator::default(),
            banner: None,
            screen_shake: 0.0,
            events: Vec::new(),
            commands: Vec::new(),
            next_id: 1,
        }
    }

    /// Full reset to a fresh run with `seed`, left in the Playing phase
    pub fn reset(&mut self, seed: u64) {
        *self = Self::new(seed);
        self.phase = GamePhase::Playing;
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an entity at the current frame with the current global speed
    pub fn spawn_entity(&mut self, kind: EntityKind, x: f32) -> u32 {
        let id = self.next_entity_id();
        self.entities.push(Entity {
            id,
            kind,
            x,
            spawn_frame: self.clock.frame,
            speed: self.entity_speed,
        });
        id
    }

    pub fn tier_label(&self) -> &'static str {
        super::tier::tier(self.player.tier_index).abilities.label
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.entities.sort_by_key(|e| e.id);
    }
}
