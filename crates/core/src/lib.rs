//! Core game logic - pure, deterministic and testable
//!
//! Everything a room needs to simulate a round, with no I/O and no clock of its own:
//!
//! - [`pieces`]: the seven tetrominoes, their shapes and colors, clockwise rotation
//! - [`board`]: 10x20 playfield with collision checks, line clears and penalty rows
//! - [`rng`]: shared 7-bag piece sequence, seedable for tests
//! - [`player`]: one participant's board, active piece and counters
//! - [`scoring`]: points, gravity interval and level progression
//! - [`game_state`]: the [`Game`] state machine driven by ticks and player actions
//! - [`snapshot`]: the serializable projection handed to observers
//! - [`scores`]: the seam finished solo scores are written through
//!
//! # Example
//!
//! ```
//! use red_tetris_core::{Game, PlayerInfo};
//! use red_tetris_types::{Difficulty, GameMode, GameStatus, PlayerAction};
//!
//! let mut game = Game::with_seed(PlayerInfo::new("p1", "Ana"), GameMode::Solo, Difficulty::Normal, 7);
//! game.start_game();
//!
//! let snap = game.handle_player_action("p1", PlayerAction::HardDrop);
//! assert_eq!(snap.status, GameStatus::Playing);
//! assert!(snap.players[0].score > 0);
//!
//! // Gravity is driven by the caller's clock.
//! let snap = game.tick(1_000);
//! assert!(snap.events.is_empty());
//! ```

pub mod board;
pub mod error;
pub mod game_state;
pub mod pieces;
pub mod player;
pub mod rng;
pub mod scores;
pub mod scoring;
pub mod snapshot;

pub use red_tetris_types as types;

pub use board::Board;
pub use error::{JoinError, PieceError};
pub use game_state::Game;
pub use pieces::{cell_color, piece_def, Piece, PieceDef, Shape, WALL_KICKS};
pub use player::{PlayerInfo, PlayerState};
pub use rng::{GameRng, PieceSequence};
pub use scores::{NoopScoreSink, ScoreEntry, ScoreSink};
pub use scoring::{fall_interval_ms, LevelProgress};
pub use snapshot::{
    ActivePieceSnapshot, GameResult, GameSnapshot, NextPiece, PlayerSnapshot, Position,
    ResultEntry,
};
