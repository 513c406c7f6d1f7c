//! High score leaderboard system
//!
//! Top 10 runs, kept in memory or persisted as a JSON file. Both forms plug
//! into the session as its score store.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::session::{ScoreRecorder, ScoreSubmission};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub player_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    /// Player's score
    pub score: u64,
    /// Tier label reached
    pub tier_label: String,
    /// Unix timestamp (ms) when achieved
    pub timestamp: u64,
}

/// High score leaderboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Insert an entry if it qualifies.
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_entry(&mut self, entry: HighScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }

        // Sorted descending; ties keep the earlier run first
        let pos = self.entries.iter().position(|e| entry.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Insert a finished run. Returns whether it beat the previous best.
    fn submit(&mut self, submission: &ScoreSubmission) -> bool {
        let is_new_high = submission.final_score > 0
            && self.top_score().is_none_or(|top| submission.final_score > top);
        let entry = HighScoreEntry {
            player_id: submission.player_id.clone(),
            display_name: submission.display_name.clone(),
            avatar_ref: submission.avatar_ref.clone(),
            score: submission.final_score,
            tier_label: submission.final_tier_label.clone(),
            timestamp: now_ms(),
        };
        if let Some(rank) = self.add_entry(entry) {
            log::info!("score {} ranked #{}", submission.final_score, rank);
        }
        is_new_high
    }

    /// Load high scores from `path`
    pub fn read(path: &Path) -> Result<Self, PersistenceError> {
        let json = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        let scores: HighScores =
            serde_json::from_str(&json).map_err(|e| PersistenceError::json(path, e))?;
        log::info!("Loaded {} high scores", scores.entries.len());
        Ok(scores)
    }

    /// Save high scores to `path`
    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(self).map_err(|e| PersistenceError::json(path, e))?;
        fs::write(path, json).map_err(|e| PersistenceError::io(path, e))?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

impl ScoreRecorder for HighScores {
    fn record_score(&mut self, submission: &ScoreSubmission) -> Result<bool, PersistenceError> {
        Ok(self.submit(submission))
    }
}

/// Leaderboard written back to disk after every recorded run
#[derive(Debug, Clone)]
pub struct HighScoreFile {
    path: PathBuf,
    pub scores: HighScores,
}

impl HighScoreFile {
    /// Open the leaderboard at `path`; a missing or unreadable file starts fresh
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let scores = match HighScores::read(&path) {
            Ok(scores) => scores,
            Err(e) => {
                log::info!("No high scores found, starting fresh ({})", e);
                HighScores::new()
            }
        };
        Self { path, scores }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreRecorder for HighScoreFile {
    fn record_score(&mut self, submission: &ScoreSubmission) -> Result<bool, PersistenceError> {
        let is_new_high = self.scores.submit(submission);
        self.scores.save(&self.path)?;
        Ok(is_new_high)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
