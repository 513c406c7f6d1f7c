//! Player preferences
//!
//! Stored as JSON next to the leaderboard; a missing or broken file falls back
//! to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Feedback ===
    /// Play audio cues
    pub sound: bool,
    /// Fire haptic pulses
    pub haptics: bool,

    // === Visual Effects ===
    /// Screen shake on obstacle hits
    pub screen_shake: bool,
    /// Particle and floating-text effects
    pub particles: bool,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,

    // === Debug ===
    /// Fixed run seed; random per launch when unset
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            haptics: true,
            screen_shake: true,
            particles: true,
            reduced_motion: false,
            seed: None,
        }
    }
}

impl Settings {
    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Read settings from `path`
    pub fn read(path: &Path) -> Result<Self, PersistenceError> {
        let json = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| PersistenceError::json(path, e))
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| PersistenceError::json(path, e))?;
        fs::write(path, json).map_err(|e| PersistenceError::io(path, e))?;
        log::info!("Settings saved");
        Ok(())
    }
}
