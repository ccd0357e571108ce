//! Scoring module - line clear points, drop points, gravity and level progression
//!
//! Points are only awarded in solo rooms; callers check the mode.

use crate::types::{
    BASE_FALL_MS, FALL_STEP_MS, HARD_DROP_POINTS, LINE_SCORES, MIN_FALL_MS, SOFT_DROP_POINTS,
};

/// Points for clearing `lines` rows with one lock (0 outside 1..=4)
pub fn line_clear_score(lines: usize) -> u32 {
    LINE_SCORES.get(lines).copied().unwrap_or(0)
}

/// Points for a hard drop over `distance` rows
pub fn hard_drop_score(distance: u32) -> u32 {
    distance * HARD_DROP_POINTS
}

/// Points for one soft-drop-triggered fall
pub fn soft_drop_score() -> u32 {
    SOFT_DROP_POINTS
}

/// Gravity interval for a level: `max(100, 1000 - 50 * (level - 1))` ms
pub fn fall_interval_ms(level: u32) -> u64 {
    let speedup = FALL_STEP_MS.saturating_mul(u64::from(level.saturating_sub(1)));
    BASE_FALL_MS.saturating_sub(speedup).max(MIN_FALL_MS)
}

/// Level counters of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub lines_to_next_level: i32,
    pub lines_per_level: u32,
}

impl LevelProgress {
    pub fn new(start_level: u32, lines_per_level: u32) -> Self {
        Self {
            level: start_level.max(1),
            lines_to_next_level: lines_per_level as i32,
            lines_per_level,
        }
    }

    /// Count `lines` cleared rows. Overshoot carries into the next level.
    ///
    /// Returns true when the level went up.
    pub fn advance(&mut self, lines: usize) -> bool {
        self.lines_to_next_level -= lines as i32;
        if self.lines_to_next_level <= 0 {
            self.level += 1;
            self.lines_to_next_level += self.lines_per_level as i32;
            true
        } else {
            false
        }
    }
}
