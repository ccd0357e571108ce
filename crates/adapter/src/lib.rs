//! Network adapter - multiplayer rooms over a TCP socket with a JSON line protocol
//!
//! # Protocol Overview
//!
//! Every message is one JSON object on its own line, tagged by `type`:
//!
//! 1. **Lobby**: `enterLobbyBrowser` streams `lobbiesListUpdate` whenever the list of
//!    multiplayer rooms changes, until `leaveLobbyBrowser`
//! 2. **Join**: `joinGame` creates the room on first join (the joiner becomes host).
//!    Rooms named `solo-*` are single-player
//! 3. **Play**: the host sends `startGame`; everyone sends `playerAction`. Every change
//!    of the room is pushed back as `gameStateUpdate`
//! 4. **Scores**: finished solo games are recorded; `getLeaderboard` answers with
//!    `leaderboardUpdate`
//!
//! Refused requests get an `error` message; the connection stays open.
//!
//! # Environment Variables
//!
//! - `RED_TETRIS_HOST`: Bind address (default: "127.0.0.1")
//! - `RED_TETRIS_PORT`: Port number (default: 3004)
//! - `RED_TETRIS_TICK_MS`: Room tick period (default: 50)
//! - `RED_TETRIS_MAX_PENDING`: Per-room command queue depth (default: 64)
//! - `RED_TETRIS_LEADERBOARD`: Score file; scores are not persisted when unset
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"joinGame","roomName":"solo-ana","playerName":"Ana","difficulty":"fast"}
//! Server -> Client: {"type":"gameStateUpdate","state":{"status":"lobby","gameMode":"solo",...}}
//! Client -> Server: {"type":"startGame"}
//! Server -> Client: {"type":"gameStateUpdate","state":{"status":"playing",...}}
//! Client -> Server: {"type":"playerAction","action":"hardDrop"}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 3004
//! {"type":"joinGame","roomName":"solo-test","playerName":"test"}
//! ```

pub mod leaderboard;
pub mod protocol;
pub mod server;

pub use red_tetris_core as core;
pub use red_tetris_engine as engine;
pub use red_tetris_types as types;

pub use leaderboard::{FileLeaderboard, LeaderboardEntry, StoredScore, DEFAULT_LEADERBOARD_LIMIT};
pub use protocol::*;
pub use server::*;
