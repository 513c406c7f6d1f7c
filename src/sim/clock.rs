//! Simulation clock
//!
//! The frame counter is the only notion of time inside the simulation.

use serde::{Deserialize, Serialize};

use super::state::GamePhase;

/// Monotonic frame counter, advanced once per display tick while playing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    pub frame: u64,
}

impl SimClock {
    /// Advance by exactly one frame if `phase` is Playing. Returns whether it moved.
    pub fn advance(&mut self, phase: GamePhase) -> bool {
        if phase != GamePhase::Playing {
            return false;
        }
        self.frame += 1;
        true
    }

    /// Frames elapsed since `since` (zero if `since` is in the future)
    #[inline]
    pub fn elapsed_since(&self, since: u64) -> u64 {
        self.frame.saturating_sub(since)
    }
}
