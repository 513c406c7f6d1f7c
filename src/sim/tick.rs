//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically: one call per
//! display refresh, one resolution pass per call.

use glam::Vec2;
use rand::Rng;

use super::collision::{entity_box, player_box};
use super::particles::{
    COLOR_BONUS, COLOR_DANGER, COLOR_GOLD, COLOR_LEVEL_UP, COLOR_SUCCESS, COLOR_TEXT, ParticleKind,
};
use super::player::GestureSample;
use super::spawn::maybe_spawn;
use super::state::{
    Banner, CollectibleKind, EntityKind, GameEvent, GamePhase, GameState, ObstacleKind,
};
use super::tier::{tier, tier_index_for};
use crate::consts::*;
use crate::feedback::{FeedbackEvent, FeedbackKind};
use crate::ms_to_frames;

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Latest gesture sample, if any
    pub gesture: Option<GestureSample>,
    /// Idle -> Playing
    pub start: bool,
    /// Playing -> Paused
    pub pause: bool,
    /// Paused -> Playing
    pub resume: bool,
    /// GameOver -> Playing with a full reset
    pub restart: bool,
    /// Leave the minigame
    pub exit: bool,
}

/// Seed for the run after one seeded with `seed` (splitmix64 step)
pub fn next_run_seed(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Apply session controls. Returns true if the tick should stop here.
fn apply_controls(state: &mut GameState, input: &TickInput) -> bool {
    if input.exit && state.phase != GamePhase::Playing && state.phase != GamePhase::Exited {
        log::info!("exiting at score {}", state.player.score);
        state.phase = GamePhase::Exited;
        return true;
    }

    match state.phase {
        GamePhase::Idle if input.start => {
            log::info!("run started (seed {})", state.seed);
            state.phase = GamePhase::Playing;
            true
        }
        GamePhase::Playing if input.pause => {
            log::info!("paused at frame {}", state.clock.frame);
            state.phase = GamePhase::Paused;
            true
        }
        GamePhase::Paused if input.resume => {
            log::info!("resumed at frame {}", state.clock.frame);
            state.phase = GamePhase::Playing;
            false
        }
        GamePhase::GameOver if input.restart => {
            let seed = next_run_seed(state.seed);
            log::info!("restarting (seed {})", seed);
            state.reset(seed);
            true
        }
        _ => false,
    }
}

/// Advance the game state by one display tick
pub fn tick(state: &mut GameState, input: &TickInput) {
    if apply_controls(state, input) {
        return;
    }

    // Don't tick unless playing
    if !state.clock.advance(state.phase) {
        return;
    }
    let frame = state.clock.frame;

    // Decay screen shake
    state.screen_shake *= 0.9;
    if state.screen_shake < 0.01 {
        state.screen_shake = 0.0;
    }

    if state
        .banner
        .as_ref()
        .is_some_and(|banner| frame >= banner.expires_at)
    {
        state.banner = None;
    }

    // Update player position
    if let Some(sample) = &input.gesture {
        state.controller.apply_sample(sample);
    }
    let (pos, tilt) = state.controller.step(SIM_DT);
    state.player.x = pos.x;
    state.player.y = pos.y;
    state.player.tilt = tilt;

    maybe_spawn(state);
    resolve_collisions(state);
    update_progression(state);

    // Ensure deterministic ordering
    state.normalize_order();
}

/// Record a feedback event and arbitrate it immediately
fn emit_feedback(state: &mut GameState, kind: FeedbackKind) {
    let frame = state.clock.frame;
    let event = FeedbackEvent { kind, frame };
    state
        .feedback
        .dispatch(&event, state.player.score, frame, &mut state.commands);
    state.events.push(GameEvent::Feedback(event));
}

/// Add points, bumping the global fall speed for every multiple of 50 crossed
pub fn award_points(state: &mut GameState, points: u64) {
    let before = state.player.score;
    let after = before.saturating_add(points);
    state.player.score = after;

    for step in (before / SPEED_STEP_POINTS + 1)..=(after / SPEED_STEP_POINTS) {
        state.entity_speed += if step * SPEED_STEP_POINTS < SPEED_KNEE_SCORE {
            SPEED_STEP_EARLY
        } else {
            SPEED_STEP_LATE
        };
    }
}

fn collect_common(state: &mut GameState, kind: CollectibleKind, at: Vec2) {
    let frame = state.clock.frame;
    let bonus = if tier(state.player.tier_index).abilities.score_bonus {
        TIER_BONUS_POINTS
    } else {
        0
    };
    let points = COLLECT_POINTS + bonus;
    award_points(state, points);
    emit_feedback(state, FeedbackKind::Collect(kind));

    state
        .particles
        .emit_burst(ParticleKind::Sparkle, at, COLOR_GOLD, 6, frame);
    state
        .particles
        .emit_text(format!("+{}", points), at, COLOR_TEXT, frame);
}

fn collect_bonus(state: &mut GameState, at: Vec2) {
    let frame = state.clock.frame;
    state.player.lives += 1;
    award_points(state, BONUS_POINTS);
    emit_feedback(state, FeedbackKind::Collect(CollectibleKind::Heart));
    log::debug!("bonus collected, lives now {}", state.player.lives);

    state
        .particles
        .emit_burst(ParticleKind::Sparkle, at, COLOR_BONUS, 12, frame);
    state
        .particles
        .emit_text(format!("+{}", BONUS_POINTS), at, COLOR_BONUS, frame);
}

fn hit_obstacle(state: &mut GameState, kind: ObstacleKind, at: Vec2) {
    let frame = state.clock.frame;
    let shield = tier(state.player.tier_index).abilities.shield_chance;
    if shield > 0.0 && state.rng.random_bool(shield as f64) {
        emit_feedback(state, FeedbackKind::Powerup);
        state
            .particles
            .emit_burst(ParticleKind::Sparkle, at, COLOR_SUCCESS, 8, frame);
        state.particles.emit_text("Shielded!", at, COLOR_SUCCESS, frame);
        return;
    }

    state.player.lives = state.player.lives.saturating_sub(1);
    emit_feedback(state, FeedbackKind::Hit(kind));
    state.screen_shake = (state.screen_shake + 0.4).min(1.0);
    state
        .particles
        .emit_burst(ParticleKind::Explosion, at, COLOR_DANGER, 8, frame);
    state.particles.emit_text("-1 life", at, COLOR_DANGER, frame);

    if state.player.lives == 0 {
        game_over(state);
    }
}

fn game_over(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    state.phase = GamePhase::GameOver;
    let tier_label = state.tier_label();
    log::info!(
        "game over: score {} tier {} at frame {}",
        state.player.score,
        tier_label,
        state.clock.frame
    );
    state.events.push(GameEvent::GameOver {
        score: state.player.score,
        tier_label,
    });
}

/// Resolve every active entity against the player once
pub fn resolve_collisions(state: &mut GameState) {
    let frame = state.clock.frame;
    let pbox = player_box(&state.player);

    // Snapshot boxes first; resolution mutates the state
    let candidates: Vec<_> = state
        .entities
        .iter()
        .map(|e| (e.id, e.kind, entity_box(e, frame), e.has_exited(frame)))
        .collect();

    let mut removed: Vec<u32> = Vec::new();
    for (id, kind, bbox, exited) in candidates {
        if state.phase != GamePhase::Playing {
            break;
        }
        if removed.contains(&id) {
            continue;
        }

        if bbox.overlaps(&pbox) {
            removed.push(id);
            let at = bbox.center();
            match kind {
                EntityKind::Collectible(c) if c.is_bonus() => collect_bonus(state, at),
                EntityKind::Collectible(c) => collect_common(state, c, at),
                EntityKind::Obstacle(o) => hit_obstacle(state, o, at),
            }
        } else if exited {
            removed.push(id);
        }
    }

    if !removed.is_empty() {
        state.entities.retain(|e| !removed.contains(&e.id));
    }
}

/// Move to the tier the score has earned, firing one level-up if it changed
pub fn update_progression(state: &mut GameState) {
    let earned = tier_index_for(state.player.score);
    if earned <= state.player.tier_index {
        return;
    }

    let frame = state.clock.frame;
    state.player.tier_index = earned;
    state.spawner.bonus_spawns_in_tier = 0;
    let label = tier(earned).abilities.label;
    log::info!("level up: tier {} ({}) at score {}", earned, label, state.player.score);

    emit_feedback(state, FeedbackKind::LevelUp { tier: earned });
    let center = Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0);
    state
        .particles
        .emit_burst(ParticleKind::Explosion, center, COLOR_LEVEL_UP, 16, frame);
    state.banner = Some(Banner {
        label: label.to_string(),
        expires_at: frame + ms_to_frames(BANNER_MS),
    });
}
