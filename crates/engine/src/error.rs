use thiserror::Error;

/// Refusals and failures of room operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room {0:?} does not exist")]
    NotFound(String),
    #[error("only the host can do that")]
    NotHost,
    #[error("need at least two players")]
    NotEnoughPlayers,
    #[error("game is not in the lobby")]
    NotInLobby,
    #[error("command queue is full")]
    Busy,
    #[error("room is closed")]
    Closed,
}
