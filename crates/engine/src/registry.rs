//! Room registry - at most one running room per name
//!
//! Joins and leaves hold the registry lock while the room answers, so a room can
//! never be deleted between a lookup and a join.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use tokio::sync::{broadcast, Mutex};

use red_tetris_core::{
    Game, GameSnapshot, NoopScoreSink, PieceSequence, PlayerInfo, ScoreSink,
};
use red_tetris_types::{Difficulty, GameMode};

use crate::error::RoomError;
use crate::room::{Role, RoomConfig, RoomHandle, RoomSummary};

/// Result of a successful join
#[derive(Debug)]
pub struct Joined {
    pub room: RoomHandle,
    pub role: Role,
    /// Subscribed before the join was applied, so the first snapshot includes the joiner
    pub updates: broadcast::Receiver<Arc<GameSnapshot>>,
}

pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    config: RoomConfig,
    scores: Arc<dyn ScoreSink>,
    lobby_changed: broadcast::Sender<()>,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig, scores: Arc<dyn ScoreSink>) -> Self {
        let (lobby_changed, _) = broadcast::channel(64);
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
            scores,
            lobby_changed,
        }
    }

    /// Registry that discards finished scores
    pub fn without_scores(config: RoomConfig) -> Self {
        Self::new(config, Arc::new(NoopScoreSink))
    }

    /// Fires whenever the lobby list may have changed
    pub fn lobby_updates(&self) -> broadcast::Receiver<()> {
        self.lobby_changed.subscribe()
    }

    fn notify_lobby(&self) {
        let _ = self.lobby_changed.send(());
    }

    /// Enter `room_name`.
    ///
    /// Players create the room (as host, in `difficulty`) when it does not exist yet.
    /// Spectators can only enter existing rooms.
    pub async fn join(
        &self,
        room_name: &str,
        info: PlayerInfo,
        spectator: bool,
        difficulty: Difficulty,
    ) -> Result<Joined, RoomError> {
        let mut rooms = self.rooms.lock().await;

        if let Some(room) = rooms.get(room_name) {
            let updates = room.subscribe();
            let role = room.join(info, spectator).await?;
            let room = room.clone();
            drop(rooms);
            self.notify_lobby();
            return Ok(Joined {
                room,
                role,
                updates,
            });
        }

        if spectator {
            return Err(RoomError::NotFound(room_name.to_string()));
        }

        let mode = GameMode::for_room(room_name);
        let sequence = match self.config.seed {
            Some(seed) => PieceSequence::seeded(seed),
            None => PieceSequence::from_entropy(),
        };
        info!(
            "creating room {} ({}, {}) for {}",
            room_name,
            mode.as_str(),
            difficulty.as_str(),
            info.name
        );
        let game = Game::new(info, mode, difficulty, sequence, Arc::clone(&self.scores));
        let room = RoomHandle::spawn(room_name, game, &self.config, self.lobby_changed.clone());
        let updates = room.subscribe();
        rooms.insert(room_name.to_string(), room.clone());
        drop(rooms);

        self.notify_lobby();
        Ok(Joined {
            room,
            role: Role::Player,
            updates,
        })
    }

    /// Leave `room_name`; the room is deleted once no player is left
    pub async fn leave(&self, room_name: &str, id: &str) -> Result<usize, RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get(room_name)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_name.to_string()))?;

        let remaining = room.leave(id).await?;
        if remaining == 0 {
            rooms.remove(room_name);
            room.close().await;
            info!("room {} is empty, deleted", room_name);
        }
        drop(rooms);

        self.notify_lobby();
        Ok(remaining)
    }

    pub async fn get(&self, room_name: &str) -> Option<RoomHandle> {
        self.rooms.lock().await.get(room_name).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Multiplayer rooms for the lobby browser, by name
    pub async fn lobbies(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.lock().await;
        let mut lobbies: Vec<RoomSummary> = rooms
            .values()
            .map(RoomHandle::summary)
            .filter(|s| s.mode == GameMode::Multiplayer)
            .collect();
        lobbies.sort_by(|a, b| a.room_name.cmp(&b.room_name));
        lobbies
    }
}
