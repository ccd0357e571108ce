use thiserror::Error;

/// Piece construction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PieceError {
    #[error("unknown piece kind: {0:?}")]
    UnknownKind(String),
}

/// Why `Game::add_player` turned a joiner away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("game already in progress")]
    GameInProgress,
    #[error("room is full")]
    RoomFull,
}
