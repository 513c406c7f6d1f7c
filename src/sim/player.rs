//! Player controller
//!
//! Gesture samples set a target; critically-damped springs pull the player
//! toward it so noisy input never teleports the sprite.

use std::sync::{Arc, Mutex};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

pub const SPRING_STIFFNESS: f32 = 220.0;
pub const SPRING_MASS: f32 = 1.0;
/// Critical damping for the constants above: 2 * sqrt(k * m)
pub const SPRING_DAMPING: f32 = 29.664_793;

/// Tilt limit in degrees
pub const MAX_TILT_DEGREES: f32 = 15.0;
/// Degrees of tilt per pixel/second of gesture velocity
pub const TILT_PER_VELOCITY: f32 = 0.02;

/// One gesture sample from the interaction layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSample {
    pub x: f32,
    pub y: f32,
    /// Horizontal gesture velocity, pixels/second
    pub velocity_x: f32,
    /// False once the finger lifts; tilt then settles back to zero
    pub active: bool,
}

/// Latest gesture sample, shared between the input callback and the tick.
///
/// Writes replace the whole sample under a lock, so a reader never sees a
/// half-updated position.
#[derive(Debug, Clone, Default)]
pub struct GestureCell(Arc<Mutex<Option<GestureSample>>>);

impl GestureCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, sample: GestureSample) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(sample);
    }

    /// Mark the current gesture as ended, keeping its last position
    pub fn release(&self) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sample) = slot.as_mut() {
            sample.active = false;
            sample.velocity_x = 0.0;
        }
    }

    pub fn latest(&self) -> Option<GestureSample> {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn clear(&self) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

/// One-dimensional critically-damped spring
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub value: f32,
    pub velocity: f32,
}

impl Spring {
    pub fn at(value: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
        }
    }

    /// Advance toward `target` by `dt` seconds.
    ///
    /// Uses the closed-form critically-damped solution, which is stable for any
    /// step size and never overshoots from rest.
    pub fn step(&mut self, target: f32, dt: f32) {
        let omega = (SPRING_STIFFNESS / SPRING_MASS).sqrt();
        let offset = self.value - target;
        let decay = (-omega * dt).exp();
        let slope = self.velocity + omega * offset;
        self.value = target + (offset + slope * dt) * decay;
        self.velocity = (self.velocity - omega * slope * dt) * decay;
    }
}

/// Legal top-left positions for the player box
pub fn clamp_to_field(pos: Vec2) -> Vec2 {
    pos.clamp(
        Vec2::new(MARGIN_LEFT, MARGIN_TOP),
        Vec2::new(
            FIELD_WIDTH - PLAYER_SIZE,
            FIELD_HEIGHT - PLAYER_SIZE - MARGIN_BOTTOM,
        ),
    )
}

/// Springs for position and tilt plus the current target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerController {
    pub x: Spring,
    pub y: Spring,
    pub tilt: Spring,
    pub target: Vec2,
    pub target_tilt: f32,
}

impl PlayerController {
    pub fn new(x: f32, y: f32) -> Self {
        let start = clamp_to_field(Vec2::new(x, y));
        Self {
            x: Spring::at(start.x),
            y: Spring::at(start.y),
            tilt: Spring::at(0.0),
            target: start,
            target_tilt: 0.0,
        }
    }

    /// Take a gesture sample as the new target
    pub fn apply_sample(&mut self, sample: &GestureSample) {
        self.target = clamp_to_field(Vec2::new(sample.x, sample.y));
        self.target_tilt = if sample.active {
            (sample.velocity_x * TILT_PER_VELOCITY).clamp(-MAX_TILT_DEGREES, MAX_TILT_DEGREES)
        } else {
            0.0
        };
    }

    /// Step all springs and return the clamped `(position, tilt)`
    pub fn step(&mut self, dt: f32) -> (Vec2, f32) {
        self.x.step(self.target.x, dt);
        self.y.step(self.target.y, dt);
        self.tilt.step(self.target_tilt, dt);

        let raw = Vec2::new(self.x.value, self.y.value);
        let clamped = clamp_to_field(raw);
        // Pinned against a wall: drop the velocity pushing into it
        if clamped.x != raw.x {
            self.x = Spring::at(clamped.x);
        }
        if clamped.y != raw.y {
            self.y = Spring::at(clamped.y);
        }
        self.tilt.value = self.tilt.value.clamp(-MAX_TILT_DEGREES, MAX_TILT_DEGREES);

        (clamped, self.tilt.value)
    }
}
