//! Particle and floating-text effects
//!
//! The set only appends and removes. Each effect carries its birth frame and
//! animates as a pure function of elapsed frames; whoever renders it reports
//! completion back through `remove`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ms_to_frames;

pub const COLOR_SUCCESS: u32 = 0x4CAF50;
pub const COLOR_DANGER: u32 = 0xF44336;
pub const COLOR_GOLD: u32 = 0xFFD54F;
pub const COLOR_BONUS: u32 = 0xE91E63;
pub const COLOR_LEVEL_UP: u32 = 0x7C4DFF;
pub const COLOR_TEXT: u32 = 0xFFFFFF;

/// Effect animation styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Radial outward burst, fades and shrinks
    Explosion,
    /// Smaller radial drift
    Sparkle,
    /// Floating label drifting upward
    Text,
}

impl ParticleKind {
    pub fn duration_frames(self) -> u64 {
        match self {
            ParticleKind::Explosion => ms_to_frames(600),
            ParticleKind::Sparkle => ms_to_frames(800),
            ParticleKind::Text => ms_to_frames(1000),
        }
    }

    fn travel(self) -> f32 {
        match self {
            ParticleKind::Explosion => 80.0,
            ParticleKind::Sparkle => 28.0,
            ParticleKind::Text => 60.0,
        }
    }
}

/// A single visual effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleEffect {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub color: u32,
    pub size: f32,
    pub kind: ParticleKind,
    pub text: Option<String>,
    /// Direction of travel in radians (ignored by text)
    pub heading: f32,
    pub born_frame: u64,
}

/// Where an effect is drawn at a given frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPose {
    pub pos: Vec2,
    pub opacity: f32,
    pub scale: f32,
}

impl ParticleEffect {
    /// Animation progress in `[0, 1)`, `None` once finished
    pub fn progress(&self, frame: u64) -> Option<f32> {
        let duration = self.kind.duration_frames();
        let elapsed = frame.saturating_sub(self.born_frame);
        (elapsed < duration).then(|| elapsed as f32 / duration as f32)
    }

    pub fn is_finished(&self, frame: u64) -> bool {
        self.progress(frame).is_none()
    }

    /// Sample the animation; `None` once the effect has completed
    pub fn sample(&self, frame: u64) -> Option<EffectPose> {
        let t = self.progress(frame)?;
        let origin = Vec2::new(self.x, self.y);
        let ease_out = 1.0 - (1.0 - t) * (1.0 - t);
        let pose = match self.kind {
            ParticleKind::Explosion => EffectPose {
                pos: origin + Vec2::from_angle(self.heading) * self.kind.travel() * ease_out,
                opacity: 1.0 - t,
                scale: 1.0 - 0.8 * t,
            },
            ParticleKind::Sparkle => EffectPose {
                pos: origin + Vec2::from_angle(self.heading) * self.kind.travel() * ease_out,
                opacity: 1.0 - t,
                scale: 1.0 + 0.3 * (t * std::f32::consts::PI).sin(),
            },
            ParticleKind::Text => EffectPose {
                pos: origin - Vec2::Y * self.kind.travel() * t,
                opacity: 1.0 - t * t,
                scale: 1.0 + 0.2 * (t * std::f32::consts::TAU).sin(),
            },
        };
        Some(pose)
    }
}

/// Active effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleSet {
    pub effects: Vec<ParticleEffect>,
    next_id: u32,
}

impl ParticleSet {
    /// Add one effect and return its id
    pub fn emit(
        &mut self,
        kind: ParticleKind,
        pos: Vec2,
        color: u32,
        text: Option<String>,
        frame: u64,
    ) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        let size = match kind {
            ParticleKind::Explosion => 10.0,
            ParticleKind::Sparkle => 6.0,
            ParticleKind::Text => 18.0,
        };
        self.effects.push(ParticleEffect {
            id,
            x: pos.x,
            y: pos.y,
            color,
            size,
            kind,
            text,
            heading: 0.0,
            born_frame: frame,
        });
        id
    }

    /// Emit `count` particles spread around `pos`.
    ///
    /// Headings are evenly spaced with a frame-hash jitter so bursts look
    /// different without touching the gameplay RNG.
    pub fn emit_burst(
        &mut self,
        kind: ParticleKind,
        pos: Vec2,
        color: u32,
        count: u32,
        frame: u64,
    ) {
        let step = std::f32::consts::TAU / count.max(1) as f32;
        for i in 0..count {
            let hash = (frame as u32)
                .wrapping_mul(2654435761)
                .wrapping_add(i.wrapping_mul(7919));
            let jitter = ((hash % 1000) as f32 / 1000.0 - 0.5) * step;
            let size_mult = 0.7 + ((hash >> 10) % 100) as f32 / 100.0 * 0.6;
            let id = self.emit(kind, pos, color, None, frame);
            if let Some(effect) = self.effects.last_mut() {
                debug_assert_eq!(effect.id, id);
                effect.heading = i as f32 * step + jitter;
                effect.size *= size_mult;
            }
        }
    }

    /// Floating label
    pub fn emit_text(&mut self, text: impl Into<String>, pos: Vec2, color: u32, frame: u64) -> u32 {
        self.emit(ParticleKind::Text, pos, color, Some(text.into()), frame)
    }

    /// Completion callback. Returns false if the id was already gone.
    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.id != id);
        self.effects.len() != before
    }

    /// Ids of effects whose animation has completed by `frame`
    pub fn finished_ids(&self, frame: u64) -> Vec<u32> {
        self.effects
            .iter()
            .filter(|e| e.is_finished(frame))
            .map(|e| e.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
