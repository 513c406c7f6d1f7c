//! Axis-aligned collision tests between the player and falling entities

use glam::Vec2;

use super::state::{Entity, PlayerState};
use crate::consts::*;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box from a top-left corner and a size
    pub fn from_corner(corner: Vec2, size: Vec2) -> Self {
        Self {
            min: corner,
            max: corner + size,
        }
    }

    /// Strict overlap; boxes that only share an edge do not collide
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

pub fn player_box(player: &PlayerState) -> Aabb {
    Aabb::from_corner(Vec2::new(player.x, player.y), Vec2::splat(PLAYER_SIZE))
}

/// Entity box at `frame`
pub fn entity_box(entity: &Entity, frame: u64) -> Aabb {
    Aabb::from_corner(
        Vec2::new(entity.x, entity.y_at(frame)),
        Vec2::splat(ENTITY_SIZE),
    )
}
