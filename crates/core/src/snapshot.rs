//! Snapshot module - the read-only projection of a room sent to observers
//!
//! Field names follow the JSON contract (camelCase). Boards travel as 20 rows of 10
//! integer cells.

use serde::Serialize;

use crate::board::Row;
use crate::pieces::{piece_def, Piece, Shape};
use crate::player::{PlayerInfo, PlayerState};
use crate::types::{
    Difficulty, GameEvent, GameMode, GameStatus, PieceKind, BOARD_HEIGHT, BOARD_WIDTH,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub status: GameStatus,
    pub winner: Option<String>,
    pub game_mode: GameMode,
    pub level: u32,
    pub lines_to_next_level: i32,
    pub lines_per_level: u32,
    pub players: Vec<PlayerSnapshot>,
    pub spectators: Vec<PlayerInfo>,
    /// One-shot cues produced since the previous snapshot
    pub events: Vec<GameEvent>,
    pub last_result: Option<GameResult>,
}

impl GameSnapshot {
    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn host(&self) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.is_host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub is_host: bool,
    pub has_lost: bool,
    pub score: u32,
    pub board: [Row; BOARD_HEIGHT as usize],
    pub active_piece: Option<ActivePieceSnapshot>,
    pub spectrum: [u8; BOARD_WIDTH as usize],
    pub next_pieces: Vec<NextPiece>,
}

impl PlayerSnapshot {
    pub(crate) fn new(player: &PlayerState, next_pieces: Vec<NextPiece>) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            is_host: player.is_host,
            has_lost: player.has_lost,
            score: player.score,
            board: player.board.rows(),
            active_piece: player.active.as_ref().map(ActivePieceSnapshot::from),
            spectrum: player.board.spectrum(),
            next_pieces,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivePieceSnapshot {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub shape: Shape,
    pub color: &'static str,
    pub position: Position,
}

impl From<&Piece> for ActivePieceSnapshot {
    fn from(piece: &Piece) -> Self {
        Self {
            kind: piece.kind,
            shape: piece.shape,
            color: piece.color(),
            position: Position {
                x: piece.x,
                y: piece.y,
            },
        }
    }
}

/// Preview of an upcoming piece in its spawn orientation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextPiece {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub shape: Shape,
    pub color: &'static str,
}

impl From<PieceKind> for NextPiece {
    fn from(kind: PieceKind) -> Self {
        let def = piece_def(kind);
        Self {
            kind,
            shape: def.shape,
            color: def.color,
        }
    }
}

/// Summary of the last finished multiplayer round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub winner: Option<String>,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    /// Unix time in milliseconds
    pub timestamp: i64,
    pub players: Vec<ResultEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub id: String,
    pub name: String,
    pub score: u32,
}

impl From<&PlayerState> for ResultEntry {
    fn from(player: &PlayerState) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            score: player.score,
        }
    }
}
