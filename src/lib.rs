//! Tier Runner - falling-entity endless runner simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, collisions, progression, particles)
//! - `feedback`: Audio/haptic cue arbitration and the playback worker
//! - `session`: Session driver owning the state and publishing snapshots
//! - `highscores`: Local leaderboard used as the score store
//! - `settings`: Player preferences

pub mod error;
pub mod feedback;
pub mod highscores;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{FeedbackError, PersistenceError};
pub use highscores::HighScores;
pub use session::{GameSession, PlayerProfile, Snapshot};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Display ticks per second; the unit all millisecond durations convert through
    pub const FRAME_RATE: u32 = 60;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / FRAME_RATE as f32;

    /// Play field dimensions
    pub const FIELD_WIDTH: f32 = 360.0;
    pub const FIELD_HEIGHT: f32 = 640.0;
    /// Reserved strips the player may not enter (HUD on top, gesture bar below)
    pub const MARGIN_LEFT: f32 = 0.0;
    pub const MARGIN_TOP: f32 = 80.0;
    pub const MARGIN_BOTTOM: f32 = 40.0;

    /// Player bounding box is a square of this side
    pub const PLAYER_SIZE: f32 = 48.0;
    /// Falling entity bounding box is a square of this side
    pub const ENTITY_SIZE: f32 = 40.0;

    pub const STARTING_LIVES: u32 = 3;

    /// Spawn interval at score 0, in frames
    pub const BASE_SPAWN_INTERVAL: u64 = 60;
    /// Spawn interval floor below the difficulty knee
    pub const SPAWN_INTERVAL_FLOOR: u64 = 35;
    /// Spawn interval floor past the difficulty knee
    pub const SPAWN_INTERVAL_LATE_FLOOR: u64 = 25;
    /// Score at which the spawn interval switches to the slower ramp
    pub const SPAWN_KNEE_SCORE: u64 = 2000;

    /// Entity fall speed at score 0, in pixels per frame
    pub const BASE_ENTITY_SPEED: f32 = 3.0;
    /// Speed gained per 50 points below `SPEED_KNEE_SCORE`
    pub const SPEED_STEP_EARLY: f32 = 0.2;
    /// Speed gained per 50 points from `SPEED_KNEE_SCORE` on
    pub const SPEED_STEP_LATE: f32 = 0.05;
    pub const SPEED_KNEE_SCORE: u64 = 500;
    pub const SPEED_STEP_POINTS: u64 = 50;

    /// Points for a common collectible
    pub const COLLECT_POINTS: u64 = 10;
    /// Extra points per collectible once the tier grants a score bonus
    pub const TIER_BONUS_POINTS: u64 = 5;
    /// Points for the rare bonus collectible
    pub const BONUS_POINTS: u64 = 50;

    /// Score window for the special-cue rate limiter
    pub const SPECIAL_CUE_WINDOW: u64 = 400;

    /// Level-up banner on-screen time
    pub const BANNER_MS: u32 = 1500;
}

/// Convert a millisecond duration into whole frames (rounded up)
#[inline]
pub const fn ms_to_frames(ms: u32) -> u64 {
    (ms as u64 * consts::FRAME_RATE as u64).div_ceil(1000)
}
