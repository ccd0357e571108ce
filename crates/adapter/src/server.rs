//! TCP server
//!
//! Accepts connections, reads one JSON message per line and routes it to the room
//! registry. Each client gets a writer task fed by a bounded channel; room
//! snapshots and lobby updates reach that channel through small forwarding tasks.
//! A client that stops reading stalls its forwarders, and the room's broadcast
//! channel then drops the oldest snapshots for that client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use red_tetris_core::{GameSnapshot, NoopScoreSink, PlayerInfo, ScoreSink};
use red_tetris_engine::{RoomConfig, RoomHandle, RoomRegistry};
use red_tetris_types::{Difficulty, SERVER_TICK_MS};

use crate::leaderboard::FileLeaderboard;
use crate::protocol::{parse_message, ClientMessage, ServerMessage};

const NOT_IN_ROOM: &str = "not in a room";

/// Messages queued per client before senders wait on the socket writer
const OUTBOUND_BUFFER: usize = 64;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Gravity tick period of every room
    pub tick_ms: u64,
    /// Per-room command queue depth; player actions beyond it are refused
    pub max_pending_commands: usize,
    /// JSON-lines score file; no persistence when `None`
    pub leaderboard_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3004,
            tick_ms: SERVER_TICK_MS,
            max_pending_commands: 64,
            leaderboard_path: None,
        }
    }
}

impl ServerConfig {
    /// Read `RED_TETRIS_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("RED_TETRIS_HOST").unwrap_or(defaults.host);
        let port = env::var("RED_TETRIS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let tick_ms = env::var("RED_TETRIS_TICK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&ms| ms > 0)
            .unwrap_or(defaults.tick_ms);
        let max_pending_commands = env::var("RED_TETRIS_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_pending_commands);
        let leaderboard_path = env::var("RED_TETRIS_LEADERBOARD")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s.into()) });

        Self {
            host,
            port,
            tick_ms,
            max_pending_commands,
            leaderboard_path,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            command_buffer: self.max_pending_commands.max(1),
            seed: None,
        }
    }
}

/// Shared server state
pub struct ServerState {
    pub registry: RoomRegistry,
    pub leaderboard: Option<Arc<FileLeaderboard>>,
}

impl ServerState {
    /// Open the leaderboard (if configured) and build the room registry around it
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let leaderboard = match &config.leaderboard_path {
            Some(path) => {
                let board = FileLeaderboard::open(path).await?;
                info!(
                    "leaderboard at {} ({} scores)",
                    board.path().display(),
                    board.len()
                );
                Some(Arc::new(board))
            }
            None => None,
        };
        let scores: Arc<dyn ScoreSink> = match &leaderboard {
            Some(board) => Arc::clone(board) as Arc<dyn ScoreSink>,
            None => Arc::new(NoopScoreSink),
        };
        Ok(Self {
            registry: RoomRegistry::new(config.room_config(), scores),
            leaderboard,
        })
    }
}

/// Start the TCP server and serve until the listener fails.
///
/// `ready_tx` receives the bound address (useful with port 0).
pub async fn run_server(
    config: ServerConfig,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let state = Arc::new(ServerState::new(&config).await?);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    info!("listening on {} (tick {} ms)", bound, config.tick_ms);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut client_id_counter = 0u64;
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = format!("client-{client_id_counter}");
        info!("{} connected from {}", client_id, addr);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id.clone(), state).await {
                warn!("{} error: {}", client_id, e);
            }
            info!("{} disconnected", client_id);
        });
    }
}

/// What one connection is currently attached to
struct Session {
    client_id: String,
    tx: mpsc::Sender<ServerMessage>,
    room: Option<RoomHandle>,
    room_forward: Option<JoinHandle<()>>,
    lobby_forward: Option<JoinHandle<()>>,
}

impl Session {
    async fn send(&self, msg: ServerMessage) {
        let _ = self.tx.send(msg).await;
    }

    async fn dispatch(&mut self, state: &Arc<ServerState>, msg: ClientMessage) {
        match msg {
            ClientMessage::EnterLobbyBrowser => {
                if self.lobby_forward.is_none() {
                    self.lobby_forward = Some(spawn_lobby_forward(Arc::clone(state), self.tx.clone()));
                }
            }
            ClientMessage::LeaveLobbyBrowser => {
                if let Some(task) = self.lobby_forward.take() {
                    task.abort();
                }
            }
            ClientMessage::GetLeaderboard { limit } => {
                let entries = state
                    .leaderboard
                    .as_ref()
                    .map(|board| board.get_leaderboard(limit))
                    .unwrap_or_default();
                self.send(ServerMessage::LeaderboardUpdate { entries }).await;
            }
            ClientMessage::JoinGame {
                room_name,
                player_name,
                is_spectator,
                difficulty,
            } => {
                if self.room.is_some() {
                    self.leave_room(state).await;
                }
                let difficulty = difficulty
                    .as_deref()
                    .map(Difficulty::from_str_or_default)
                    .unwrap_or_default();
                let info = PlayerInfo::new(self.client_id.clone(), player_name);
                match state
                    .registry
                    .join(&room_name, info, is_spectator, difficulty)
                    .await
                {
                    Ok(joined) => {
                        debug!("{} joined {} as {:?}", self.client_id, room_name, joined.role);
                        self.room_forward = Some(spawn_room_forward(joined.updates, self.tx.clone()));
                        self.room = Some(joined.room);
                    }
                    Err(e) => self.send(ServerMessage::error(e.to_string())).await,
                }
            }
            ClientMessage::StartGame => {
                let Some(room) = &self.room else {
                    self.send(ServerMessage::error(NOT_IN_ROOM)).await;
                    return;
                };
                if let Err(e) = room.start(&self.client_id).await {
                    debug!("{} cannot start: {}", self.client_id, e);
                    self.send(ServerMessage::error(e.to_string())).await;
                }
            }
            ClientMessage::RestartGame => {
                let Some(room) = &self.room else {
                    self.send(ServerMessage::error(NOT_IN_ROOM)).await;
                    return;
                };
                if let Err(e) = room.restart(&self.client_id).await {
                    debug!("{} cannot restart: {}", self.client_id, e);
                    self.send(ServerMessage::error(e.to_string())).await;
                }
            }
            ClientMessage::PlayerAction { action } => {
                if let Some(room) = &self.room {
                    if let Err(e) = room.action(&self.client_id, action) {
                        self.send(ServerMessage::error(e.to_string())).await;
                    }
                }
            }
            ClientMessage::LeaveGame => self.leave_room(state).await,
        }
    }

    async fn leave_room(&mut self, state: &Arc<ServerState>) {
        if let Some(task) = self.room_forward.take() {
            task.abort();
        }
        let Some(room) = self.room.take() else {
            return;
        };
        match state.registry.leave(room.name(), &self.client_id).await {
            Ok(remaining) => debug!(
                "{} left {} ({} players remain)",
                self.client_id,
                room.name(),
                remaining
            ),
            Err(e) => debug!("{} leaving {}: {}", self.client_id, room.name(), e),
        }
    }

    async fn close(&mut self, state: &Arc<ServerState>) {
        self.leave_room(state).await;
        if let Some(task) = self.lobby_forward.take() {
            task.abort();
        }
    }
}

fn spawn_room_forward(
    mut updates: broadcast::Receiver<Arc<GameSnapshot>>,
    tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(state) => {
                    if tx.send(ServerMessage::GameStateUpdate { state }).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("slow client skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_lobby_forward(
    state: Arc<ServerState>,
    tx: mpsc::Sender<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = state.registry.lobby_updates();
        loop {
            let lobbies = state.registry.lobbies().await;
            if tx
                .send(ServerMessage::LobbiesListUpdate { lobbies })
                .await
                .is_err()
            {
                break;
            }
            match changes.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: String,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if let Err(e) = serde_json::to_writer(&mut buf, &msg) {
                warn!("cannot encode message: {}", e);
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut session = Session {
        client_id,
        tx,
        room: None,
        room_forward: None,
        lobby_forward: None,
    };

    let result = read_loop(&mut reader, &mut session, &state).await;

    // Leave on every exit path, including read errors.
    session.close(&state).await;
    drop(session);
    let _ = write_task.await;

    result
}

async fn read_loop(
    reader: &mut BufReader<OwnedReadHalf>,
    session: &mut Session,
    state: &Arc<ServerState>,
) -> anyhow::Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(());
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(msg) => session.dispatch(state, msg).await,
            Err(e) => {
                warn!("{} sent a bad message: {}", session.client_id, e);
                session.send(ServerMessage::error(e.to_string())).await;
            }
        }
    }
}
