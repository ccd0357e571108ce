//! Protocol module - line-delimited JSON messages
//!
//! One JSON object per line in each direction, tagged by `type`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use red_tetris_core::GameSnapshot;
use red_tetris_engine::RoomSummary;
use red_tetris_types::PlayerAction;

use crate::leaderboard::LeaderboardEntry;

// ============== Client -> Server Messages ==============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start receiving lobby list updates
    EnterLobbyBrowser,
    LeaveLobbyBrowser,
    GetLeaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    JoinGame {
        room_name: String,
        player_name: String,
        #[serde(default)]
        is_spectator: bool,
        /// Unknown names fall back to normal
        #[serde(default)]
        difficulty: Option<String>,
    },
    StartGame,
    RestartGame,
    PlayerAction {
        action: PlayerAction,
    },
    LeaveGame,
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    GameStateUpdate { state: Arc<GameSnapshot> },
    LobbiesListUpdate { lobbies: Vec<RoomSummary> },
    LeaderboardUpdate { entries: Vec<LeaderboardEntry> },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("message has no type")]
    MissingType,
}

/// Parse one client line.
///
/// Distinguishes unknown `type` values from malformed payloads of known types.
pub fn parse_message(line: &str) -> Result<ClientMessage, ProtocolError> {
    const KNOWN: [&str; 8] = [
        "enterLobbyBrowser",
        "leaveLobbyBrowser",
        "getLeaderboard",
        "joinGame",
        "startGame",
        "restartGame",
        "playerAction",
        "leaveGame",
    ];

    match serde_json::from_str::<ClientMessage>(line) {
        Ok(msg) => Ok(msg),
        Err(e) => {
            #[derive(Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: Option<String>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(line)?
                .msg_type
                .ok_or(ProtocolError::MissingType)?;
            if KNOWN.contains(&msg_type.as_str()) {
                Err(ProtocolError::Json(e))
            } else {
                Err(ProtocolError::UnknownType(msg_type))
            }
        }
    }
}
