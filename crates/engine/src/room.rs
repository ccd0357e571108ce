//! Room actor - one task per room owning its [`Game`]
//!
//! Every tick and every command for a room goes through a single task, so the game
//! state is never touched concurrently. Each processed stimulus publishes a snapshot
//! on the room's broadcast channel before the next one is taken.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};

use red_tetris_core::{Game, GameSnapshot, PlayerInfo};
use red_tetris_types::{GameMode, GameStatus, PlayerAction, SERVER_TICK_MS};

use crate::error::RoomError;

/// Snapshots buffered per subscriber before slow readers start lagging
const SNAPSHOT_BUFFER: usize = 64;

/// Per-room runtime settings
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Gravity driver period while a round runs
    pub tick: Duration,
    /// Bounded command queue depth; player actions beyond it are refused
    pub command_buffer: usize,
    /// Fixed bag seed for reproducible rooms (tests); entropy when `None`
    pub seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(SERVER_TICK_MS),
            command_buffer: 64,
            seed: None,
        }
    }
}

/// How a connection ended up in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player,
    Spectator,
}

/// Lobby browser entry for a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_name: String,
    pub host_name: String,
    pub player_count: usize,
    pub status: GameStatus,
    #[serde(skip)]
    pub mode: GameMode,
}

impl RoomSummary {
    fn of(name: &str, game: &Game) -> Self {
        Self {
            room_name: name.to_string(),
            host_name: game
                .players()
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            player_count: game.players().len(),
            status: game.status(),
            mode: game.mode(),
        }
    }
}

#[derive(Debug)]
pub enum RoomCommand {
    Join {
        info: PlayerInfo,
        spectator: bool,
        reply: oneshot::Sender<Role>,
    },
    Leave {
        id: String,
        reply: oneshot::Sender<usize>,
    },
    Start {
        requester: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Restart {
        requester: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Action {
        player_id: String,
        action: PlayerAction,
    },
    Snapshot {
        reply: oneshot::Sender<Arc<GameSnapshot>>,
    },
    Close,
}

/// Cloneable address of a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    commands: mpsc::Sender<RoomCommand>,
    updates: broadcast::Sender<Arc<GameSnapshot>>,
    summary: watch::Receiver<RoomSummary>,
}

impl RoomHandle {
    /// Spawn the actor for `game` on the current runtime.
    ///
    /// `lobby_changed` fires whenever the room's lobby entry changes.
    pub fn spawn(
        name: &str,
        game: Game,
        config: &RoomConfig,
        lobby_changed: broadcast::Sender<()>,
    ) -> Self {
        let (commands, rx) = mpsc::channel(config.command_buffer.max(1));
        let (updates, _) = broadcast::channel(SNAPSHOT_BUFFER);
        let (summary_tx, summary) = watch::channel(RoomSummary::of(name, &game));

        let actor = RoomActor {
            name: name.to_string(),
            game,
            commands: rx,
            updates: updates.clone(),
            summary: summary_tx,
            lobby_changed,
            last: None,
        };
        tokio::spawn(actor.run(config.tick));

        Self {
            name: Arc::from(name),
            commands,
            updates,
            summary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GameSnapshot>> {
        self.updates.subscribe()
    }

    pub fn summary(&self) -> RoomSummary {
        self.summary.borrow().clone()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| RoomError::Closed)?;
        rx.await.map_err(|_| RoomError::Closed)
    }

    /// Join as player, or as spectator when asked to or when the game refuses the player
    pub async fn join(&self, info: PlayerInfo, spectator: bool) -> Result<Role, RoomError> {
        self.request(|reply| RoomCommand::Join {
            info,
            spectator,
            reply,
        })
        .await
    }

    /// Remove a participant; returns the players left
    pub async fn leave(&self, id: &str) -> Result<usize, RoomError> {
        let id = id.to_string();
        self.request(|reply| RoomCommand::Leave { id, reply }).await
    }

    pub async fn start(&self, requester: &str) -> Result<(), RoomError> {
        let requester = requester.to_string();
        self.request(|reply| RoomCommand::Start { requester, reply })
            .await?
    }

    pub async fn restart(&self, requester: &str) -> Result<(), RoomError> {
        let requester = requester.to_string();
        self.request(|reply| RoomCommand::Restart { requester, reply })
            .await?
    }

    /// Queue a player input without waiting. Refused when the queue is full.
    pub fn action(&self, player_id: &str, action: PlayerAction) -> Result<(), RoomError> {
        self.commands
            .try_send(RoomCommand::Action {
                player_id: player_id.to_string(),
                action,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => RoomError::Busy,
                mpsc::error::TrySendError::Closed(_) => RoomError::Closed,
            })
    }

    /// Latest published snapshot (does not consume events)
    pub async fn snapshot(&self) -> Result<Arc<GameSnapshot>, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Stop the actor; pending subscribers see the channel close
    pub async fn close(&self) {
        let _ = self.commands.send(RoomCommand::Close).await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

struct RoomActor {
    name: String,
    game: Game,
    commands: mpsc::Receiver<RoomCommand>,
    updates: broadcast::Sender<Arc<GameSnapshot>>,
    summary: watch::Sender<RoomSummary>,
    lobby_changed: broadcast::Sender<()>,
    last: Option<Arc<GameSnapshot>>,
}

impl RoomActor {
    async fn run(mut self, tick: Duration) {
        let epoch = Instant::now();
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let snapshot = self.game.snapshot();
        self.publish(snapshot);

        loop {
            let playing = self.game.status() == GameStatus::Playing;
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(RoomCommand::Close) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = ticker.tick(), if playing => {
                    let now_ms = epoch.elapsed().as_millis() as u64;
                    let snapshot = self.game.tick(now_ms);
                    if snapshot.status != GameStatus::Playing {
                        info!("room {}: round over, stopping ticks", self.name);
                    }
                    self.publish(snapshot);
                }
            }
        }

        debug!("room {}: actor stopped", self.name);
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                info,
                spectator,
                reply,
            } => {
                let role = self.join(info, spectator);
                let snapshot = self.game.snapshot();
                self.publish(snapshot);
                let _ = reply.send(role);
            }
            RoomCommand::Leave { id, reply } => {
                let before = self.game.players().len();
                let remaining = self.game.remove_player(&id);
                if remaining == before {
                    self.game.remove_spectator(&id);
                }
                debug!("room {}: {} left, {} players remain", self.name, id, remaining);
                let snapshot = self.game.snapshot();
                self.publish(snapshot);
                let _ = reply.send(remaining);
            }
            RoomCommand::Start { requester, reply } => {
                let result = self.check_host(&requester).and_then(|()| {
                    if self.game.status() == GameStatus::Lobby {
                        Ok(())
                    } else {
                        Err(RoomError::NotInLobby)
                    }
                });
                if result.is_ok() {
                    info!("room {}: started by {}", self.name, requester);
                    let snapshot = self.game.start_game();
                    self.publish(snapshot);
                }
                let _ = reply.send(result);
            }
            RoomCommand::Restart { requester, reply } => {
                let result = self.check_host(&requester);
                if result.is_ok() {
                    info!("room {}: restarted by {}", self.name, requester);
                    let snapshot = self.game.restart();
                    self.publish(snapshot);
                }
                let _ = reply.send(result);
            }
            RoomCommand::Action { player_id, action } => {
                let snapshot = self.game.handle_player_action(&player_id, action);
                self.publish(snapshot);
            }
            RoomCommand::Snapshot { reply } => {
                let latest = match &self.last {
                    Some(latest) => Arc::clone(latest),
                    None => {
                        let snapshot = Arc::new(self.game.snapshot());
                        self.last = Some(Arc::clone(&snapshot));
                        snapshot
                    }
                };
                let _ = reply.send(latest);
            }
            RoomCommand::Close => {}
        }
    }

    fn join(&mut self, info: PlayerInfo, spectator: bool) -> Role {
        if !spectator {
            match self.game.add_player(info.clone()) {
                Ok(()) => {
                    debug!("room {}: player {} joined", self.name, info.id);
                    return Role::Player;
                }
                Err(e) => {
                    info!(
                        "room {}: {} joins as spectator ({})",
                        self.name, info.name, e
                    );
                }
            }
        }
        self.game.add_spectator(info);
        Role::Spectator
    }

    /// Host only, and multiplayer rounds need company
    fn check_host(&self, requester: &str) -> Result<(), RoomError> {
        let players = self.game.players();
        let is_host = players
            .first()
            .is_some_and(|p| p.id == requester && p.is_host);
        if !is_host {
            return Err(RoomError::NotHost);
        }
        if self.game.mode() == GameMode::Multiplayer && players.len() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        Ok(())
    }

    fn publish(&mut self, snapshot: GameSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.last = Some(Arc::clone(&snapshot));
        // No subscribers is fine.
        let _ = self.updates.send(snapshot);

        let summary = RoomSummary::of(&self.name, &self.game);
        let changed = self.summary.send_if_modified(|current| {
            if *current == summary {
                false
            } else {
                *current = summary;
                true
            }
        });
        if changed {
            let _ = self.lobby_changed.send(());
        }
    }
}
