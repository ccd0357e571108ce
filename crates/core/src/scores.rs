//! Score persistence seam
//!
//! The engine hands finished solo scores to a [`ScoreSink`] and never waits for or
//! observes the outcome. Implementations must not block.

use serde::{Deserialize, Serialize};

use crate::types::Difficulty;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    pub difficulty: Difficulty,
}

/// Fire-and-forget score writer. Scores of 0 are ignored by implementations.
pub trait ScoreSink: Send + Sync {
    fn add_score(&self, entry: ScoreEntry);
}

/// Discards every score
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScoreSink;

impl ScoreSink for NoopScoreSink {
    fn add_score(&self, _entry: ScoreEntry) {}
}
