//! Error types for the collaborator boundaries
//!
//! The simulation itself never fails; these only surface from playback backends
//! and file-backed stores, and callers log them and carry on.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by an audio/haptic backend
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("cue {cue} failed to play: {reason}")]
    Playback { cue: &'static str, reason: String },
    #[error("haptic pulse failed: {0}")]
    Haptic(String),
}

/// Failure reading or writing a persisted file
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("score store rejected submission: {0}")]
    Rejected(String),
}

impl PersistenceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
