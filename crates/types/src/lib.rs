//! Core types module - shared data structures and constants
//!
//! This module defines the vocabulary shared by the engine, the room actors and the
//! wire protocol. Everything here is plain data: no I/O, no clocks, no randomness.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 at the top)
//!
//! Cells are exchanged as small integers: `0` is empty, `1..=7` is a locked piece
//! id and `-1` is an indestructible penalty cell.
//!
//! # Timing
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `SERVER_TICK_MS` | 50 | Period of the per-room tick driver |
//! | `BASE_FALL_MS` | 1000 | Gravity interval at level 1 |
//! | `FALL_STEP_MS` | 50 | Gravity speed-up per level |
//! | `MIN_FALL_MS` | 100 | Gravity floor |
//!
//! # Scoring
//!
//! Line clears (solo mode only): 40 / 100 / 300 / 1200 for 1-4 lines.
//! Soft drop awards 1 point per cell, hard drop 2 points per cell.
//!
//! # Examples
//!
//! ```
//! use red_tetris_types::{Difficulty, PieceKind, PlayerAction, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_str("t"), Some(PieceKind::T));
//! assert_eq!(PieceKind::T.id(), 3);
//!
//! assert_eq!(PlayerAction::from_str("hardDrop"), Some(PlayerAction::HardDrop));
//!
//! let settings = Difficulty::Fast.settings();
//! assert_eq!(settings.start_level, 8);
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Period of the per-room tick driver (20 ticks per second)
pub const SERVER_TICK_MS: u64 = 50;

/// Gravity interval at level 1
pub const BASE_FALL_MS: u64 = 1000;

/// Gravity speed-up per level above 1
pub const FALL_STEP_MS: u64 = 50;

/// Gravity never gets faster than this
pub const MIN_FALL_MS: u64 = 100;

/// Maximum number of players in one room
pub const MAX_PLAYERS: usize = 4;

/// Number of upcoming pieces exposed per player in snapshots
pub const NEXT_PIECE_COUNT: usize = 3;

/// Wire value of an empty cell
pub const EMPTY_CELL: i8 = 0;

/// Wire value of an indestructible penalty cell
pub const PENALTY_CELL: i8 = -1;

/// Display color of penalty cells
pub const PENALTY_COLOR: &str = "rgb(102, 102, 102)";

/// Line clear scoring table, indexed by lines cleared.
///
/// Only solo games award line clear points.
pub const LINE_SCORES: [u32; 5] = [0, 40, 100, 300, 1200];

/// Points per cell for a soft-drop-triggered fall (solo only)
pub const SOFT_DROP_POINTS: u32 = 1;

/// Points per cell travelled by a hard drop (solo only)
pub const HARD_DROP_POINTS: u32 = 2;


/// The seven tetromino piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds in catalog order (the order a fresh bag starts from before shuffling)
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from its symbol (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use red_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "I" => Some(PieceKind::I),
            "O" => Some(PieceKind::O),
            "T" => Some(PieceKind::T),
            "S" => Some(PieceKind::S),
            "Z" => Some(PieceKind::Z),
            "J" => Some(PieceKind::J),
            "L" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// One-letter symbol used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::O => "O",
            PieceKind::T => "T",
            PieceKind::S => "S",
            PieceKind::Z => "Z",
            PieceKind::J => "J",
            PieceKind::L => "L",
        }
    }

    /// Numeric id stamped into the board when a piece of this kind locks
    pub fn id(&self) -> i8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }

    /// Inverse of [`PieceKind::id`]
    pub fn from_id(id: i8) -> Option<Self> {
        PieceKind::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

/// A cell on a player's board
///
/// Serialized as its integer id so boards travel as plain number matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(PieceKind),
    Penalty,
}

impl Cell {
    pub fn id(&self) -> i8 {
        match self {
            Cell::Empty => EMPTY_CELL,
            Cell::Block(kind) => kind.id(),
            Cell::Penalty => PENALTY_CELL,
        }
    }

    pub fn from_id(id: i8) -> Option<Self> {
        match id {
            EMPTY_CELL => Some(Cell::Empty),
            PENALTY_CELL => Some(Cell::Penalty),
            other => PieceKind::from_id(other).map(Cell::Block),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i8(self.id())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = i8::deserialize(deserializer)?;
        Cell::from_id(id)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cell id {id}")))
    }
}

/// Discrete commands a player can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerAction {
    /// Move piece one column left
    MoveLeft,
    /// Move piece one column right
    MoveRight,
    /// Rotate 90° clockwise, with horizontal wall kicks
    Rotate,
    /// Request one accelerated fall on the next tick
    SoftDrop,
    /// Drop to the lowest legal row and lock immediately
    HardDrop,
}

impl PlayerAction {
    /// Parse action from its wire name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use red_tetris_types::PlayerAction;
    ///
    /// assert_eq!(PlayerAction::from_str("moveLeft"), Some(PlayerAction::MoveLeft));
    /// assert_eq!(PlayerAction::from_str("ROTATE"), Some(PlayerAction::Rotate));
    /// assert_eq!(PlayerAction::from_str("hold"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(PlayerAction::MoveLeft),
            "moveright" => Some(PlayerAction::MoveRight),
            "rotate" => Some(PlayerAction::Rotate),
            "softdrop" => Some(PlayerAction::SoftDrop),
            "harddrop" => Some(PlayerAction::HardDrop),
            _ => None,
        }
    }

    /// camelCase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAction::MoveLeft => "moveLeft",
            PlayerAction::MoveRight => "moveRight",
            PlayerAction::Rotate => "rotate",
            PlayerAction::SoftDrop => "softDrop",
            PlayerAction::HardDrop => "hardDrop",
        }
    }
}

/// Room mode. Solo rooms score line clears and drops; multiplayer rooms trade penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Solo,
    Multiplayer,
}

impl GameMode {
    /// Rooms named `solo-...` are solo rooms
    pub fn for_room(room_name: &str) -> Self {
        if room_name.starts_with("solo-") {
            GameMode::Solo
        } else {
            GameMode::Multiplayer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Solo => "solo",
            GameMode::Multiplayer => "multiplayer",
        }
    }
}

/// Lifecycle of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Lobby,
    Playing,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Lobby => "lobby",
            GameStatus::Playing => "playing",
            GameStatus::Finished => "finished",
        }
    }
}

/// Level preset for a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Normal,
    Fast,
    Hardcore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySettings {
    pub start_level: u32,
    pub lines_per_level: u32,
}

impl Difficulty {
    pub fn settings(&self) -> DifficultySettings {
        match self {
            Difficulty::Normal => DifficultySettings {
                start_level: 1,
                lines_per_level: 5,
            },
            Difficulty::Fast => DifficultySettings {
                start_level: 8,
                lines_per_level: 5,
            },
            Difficulty::Hardcore => DifficultySettings {
                start_level: 15,
                lines_per_level: 5,
            },
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Difficulty::Normal),
            "fast" => Some(Difficulty::Fast),
            "hardcore" => Some(Difficulty::Hardcore),
            _ => None,
        }
    }

    /// Unknown names from clients fall back to `normal`
    pub fn from_str_or_default(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Normal => "normal",
            Difficulty::Fast => "fast",
            Difficulty::Hardcore => "hardcore",
        }
    }
}

/// One-shot events for sound and animation cues.
///
/// Collected while a stimulus is processed and handed out exactly once, inside the
/// next snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameEvent {
    Move,
    Rotate,
    HardDrop,
    PieceLock,
    LineClear,
    GameOver,
}
