//! Player module - one participant's mutable game data

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::pieces::Piece;

/// Identity of a connection inside a room (players and spectators alike)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
}

impl PlayerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub is_host: bool,
    pub board: Board,
    pub active: Option<Piece>,
    /// Cursor into the room's shared piece sequence. Never rewound within a round.
    pub piece_index: usize,
    /// Timestamp (ms) of the last natural gravity fall
    pub last_fall_ms: u64,
    /// Set by a soft-drop action, consumed by the next tick
    pub soft_drop_requested: bool,
    pub has_lost: bool,
    pub score: u32,
}

impl PlayerState {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_host,
            board: Board::new(),
            active: None,
            piece_index: 0,
            last_fall_ms: 0,
            soft_drop_requested: false,
            has_lost: false,
            score: 0,
        }
    }

    /// Reinitialize everything except identity and host flag
    pub fn reset(&mut self) {
        self.board.clear();
        self.active = None;
        self.piece_index = 0;
        self.last_fall_ms = 0;
        self.soft_drop_requested = false;
        self.has_lost = false;
        self.score = 0;
    }

    pub fn assign_new_piece(&mut self, piece: Piece) {
        self.active = Some(piece);
    }

    /// Still in the round
    pub fn is_active(&self) -> bool {
        !self.has_lost
    }

    /// Push `rows` penalty rows from the bottom.
    ///
    /// Each row also lifts the active piece by one while its anchor is below row 0.
    pub fn receive_penalty_rows(&mut self, rows: usize) {
        for _ in 0..rows {
            self.board.push_penalty_row();
            if let Some(piece) = self.active.as_mut() {
                if piece.y > 0 {
                    piece.y -= 1;
                }
            }
        }
    }
}
