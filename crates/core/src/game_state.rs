//! Game module - the per-room state machine
//!
//! A [`Game`] owns every player's board, the room's shared piece sequence and the
//! round lifecycle (lobby -> playing -> finished). It is driven by two stimuli:
//! [`Game::tick`] for gravity and [`Game::handle_player_action`] for input. Both
//! return a fresh [`GameSnapshot`].
//!
//! `Game` is not synchronized. Callers serialize every call for one room; the engine
//! crate does this with one actor task per room.

use std::cmp::Reverse;
use std::sync::Arc;

use log::{debug, info};

use crate::error::JoinError;
use crate::pieces::{Piece, WALL_KICKS};
use crate::player::{PlayerInfo, PlayerState};
use crate::rng::PieceSequence;
use crate::scores::{NoopScoreSink, ScoreEntry, ScoreSink};
use crate::scoring::{
    fall_interval_ms, hard_drop_score, line_clear_score, soft_drop_score, LevelProgress,
};
use crate::snapshot::{GameResult, GameSnapshot, NextPiece, PlayerSnapshot, ResultEntry};
use crate::types::{
    Difficulty, GameEvent, GameMode, GameStatus, PieceKind, PlayerAction, MAX_PLAYERS,
    NEXT_PIECE_COUNT,
};

pub struct Game {
    players: Vec<PlayerState>,
    spectators: Vec<PlayerInfo>,
    sequence: PieceSequence,
    mode: GameMode,
    difficulty: Difficulty,
    status: GameStatus,
    winner: Option<String>,
    last_result: Option<GameResult>,
    progress: LevelProgress,
    events: Vec<GameEvent>,
    scores: Arc<dyn ScoreSink>,
}

impl Game {
    /// New room in the lobby with `host` as its only player
    pub fn new(
        host: PlayerInfo,
        mode: GameMode,
        difficulty: Difficulty,
        sequence: PieceSequence,
        scores: Arc<dyn ScoreSink>,
    ) -> Self {
        let settings = difficulty.settings();
        Self {
            players: vec![PlayerState::new(host.id, host.name, true)],
            spectators: Vec::new(),
            sequence,
            mode,
            difficulty,
            status: GameStatus::Lobby,
            winner: None,
            last_result: None,
            progress: LevelProgress::new(settings.start_level, settings.lines_per_level),
            events: Vec::new(),
            scores,
        }
    }

    /// Deterministic room without score persistence
    pub fn with_seed(host: PlayerInfo, mode: GameMode, difficulty: Difficulty, seed: u64) -> Self {
        Self::new(
            host,
            mode,
            difficulty,
            PieceSequence::seeded(seed),
            Arc::new(NoopScoreSink),
        )
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn level(&self) -> u32 {
        self.progress.level
    }

    pub fn lines_to_next_level(&self) -> i32 {
        self.progress.lines_to_next_level
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn last_result(&self) -> Option<&GameResult> {
        self.last_result.as_ref()
    }

    /// Players in join order; index 0 is the host
    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn spectators(&self) -> &[PlayerInfo] {
        &self.spectators
    }

    pub fn host(&self) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn player(&self, id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn has_spectator(&self, id: &str) -> bool {
        self.spectators.iter().any(|s| s.id == id)
    }

    pub fn sequence(&self) -> &PieceSequence {
        &self.sequence
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn is_solo(&self) -> bool {
        self.mode == GameMode::Solo
    }

    fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    /// Begin a round. Only effective from the lobby.
    pub fn start_game(&mut self) -> GameSnapshot {
        if self.status == GameStatus::Lobby {
            let settings = self.difficulty.settings();
            self.progress = LevelProgress::new(settings.start_level, settings.lines_per_level);
            self.begin_round();
            info!(
                "round started: mode={} difficulty={} level={} players={}",
                self.mode.as_str(),
                self.difficulty.as_str(),
                self.progress.level,
                self.players.len()
            );
        }
        self.snapshot()
    }

    /// Start a new round with the current players, whatever the status.
    ///
    /// The level and its line counter carry over; only [`Game::start_game`] resets them.
    pub fn restart(&mut self) -> GameSnapshot {
        self.begin_round();
        info!("round restarted with {} players", self.players.len());
        self.snapshot()
    }

    fn begin_round(&mut self) {
        self.status = GameStatus::Playing;
        self.winner = None;
        self.last_result = None;
        self.sequence.reset();
        for idx in 0..self.players.len() {
            self.players[idx].reset();
            self.spawn_piece(idx);
        }
    }

    /// Advance gravity for every player still in the round.
    ///
    /// `now_ms` is any monotonic millisecond clock; only differences matter.
    pub fn tick(&mut self, now_ms: u64) -> GameSnapshot {
        if self.status == GameStatus::Playing {
            for idx in 0..self.players.len() {
                if self.status != GameStatus::Playing {
                    break;
                }
                if self.players[idx].has_lost {
                    continue;
                }
                if self.players[idx].active.is_none() && !self.spawn_piece(idx) {
                    self.end_if_decided();
                    continue;
                }
                self.fall(idx, now_ms);
            }
        }
        self.snapshot()
    }

    fn fall(&mut self, idx: usize, now_ms: u64) {
        let interval = fall_interval_ms(self.progress.level);
        let solo = self.is_solo();
        let player = &mut self.players[idx];

        let due = now_ms.saturating_sub(player.last_fall_ms) >= interval;
        if !due && !player.soft_drop_requested {
            return;
        }
        if due {
            player.last_fall_ms = now_ms;
        } else if solo {
            player.score += soft_drop_score();
        }
        player.soft_drop_requested = false;

        let Some(piece) = player.active else {
            return;
        };
        let lower = piece.shifted(0, 1);
        if lower.is_valid(&player.board) {
            player.active = Some(lower);
        } else {
            self.lock_active(idx);
            self.spawn_or_lose(idx);
        }
    }

    /// Apply one input from a player.
    ///
    /// Unknown players, players without a piece and actions outside a running round
    /// are ignored; the current snapshot is still returned.
    pub fn handle_player_action(&mut self, player_id: &str, action: PlayerAction) -> GameSnapshot {
        if self.status == GameStatus::Playing {
            if let Some(idx) = self.index_of(player_id) {
                self.apply_action(idx, action);
            }
        }
        self.snapshot()
    }

    fn apply_action(&mut self, idx: usize, action: PlayerAction) {
        let player = &mut self.players[idx];
        let Some(piece) = player.active else {
            return;
        };

        match action {
            PlayerAction::MoveLeft | PlayerAction::MoveRight => {
                let dx = if action == PlayerAction::MoveLeft { -1 } else { 1 };
                let candidate = piece.shifted(dx, 0);
                if candidate.is_valid(&player.board) {
                    player.active = Some(candidate);
                    self.events.push(GameEvent::Move);
                }
            }
            PlayerAction::Rotate => {
                if piece.kind == PieceKind::O {
                    return;
                }
                let rotated = Piece {
                    shape: piece.shape.rotated_cw(),
                    ..piece
                };
                let kicked = WALL_KICKS
                    .iter()
                    .map(|&(dx, dy)| rotated.shifted(dx, dy))
                    .find(|candidate| candidate.is_valid(&player.board));
                if let Some(candidate) = kicked {
                    player.active = Some(candidate);
                    self.events.push(GameEvent::Rotate);
                }
            }
            PlayerAction::SoftDrop => player.soft_drop_requested = true,
            PlayerAction::HardDrop => self.hard_drop(idx),
        }
    }

    fn hard_drop(&mut self, idx: usize) {
        self.events.push(GameEvent::HardDrop);
        let solo = self.is_solo();
        let player = &mut self.players[idx];
        let Some(piece) = player.active else {
            return;
        };

        let mut landed = piece;
        while landed.shifted(0, 1).is_valid(&player.board) {
            landed = landed.shifted(0, 1);
        }
        if solo {
            player.score += hard_drop_score((landed.y - piece.y) as u32);
        }
        player.active = Some(landed);

        self.lock_active(idx);
        self.spawn_or_lose(idx);
    }

    /// Stamp the active piece, clear lines, send penalties and advance the level
    fn lock_active(&mut self, idx: usize) {
        let solo = self.is_solo();
        let player = &mut self.players[idx];
        let Some(piece) = player.active.take() else {
            return;
        };
        self.events.push(GameEvent::PieceLock);

        player.board.lock_piece(&piece);
        let cleared = player.board.clear_lines().len();
        if cleared == 0 {
            return;
        }
        self.events.push(GameEvent::LineClear);
        if solo {
            player.score += line_clear_score(cleared);
        }

        if cleared > 1 {
            let penalty = cleared - 1;
            for (i, opponent) in self.players.iter_mut().enumerate() {
                if i != idx && opponent.is_active() {
                    debug!("{} receives {} penalty rows", opponent.name, penalty);
                    opponent.receive_penalty_rows(penalty);
                }
            }
        }

        if self.progress.advance(cleared) {
            debug!("level up: {}", self.progress.level);
        }
    }

    /// Draw the player's next piece and center it on the top row.
    ///
    /// A piece that collides at spawn is not assigned; the player loses instead.
    fn spawn_piece(&mut self, idx: usize) -> bool {
        let kind = self.sequence.next_for(&mut self.players[idx]);
        let piece = Piece::spawned(kind);
        let player = &mut self.players[idx];
        if piece.is_valid(&player.board) {
            player.assign_new_piece(piece);
            true
        } else {
            player.has_lost = true;
            player.active = None;
            debug!("{} topped out", player.name);
            false
        }
    }

    fn spawn_or_lose(&mut self, idx: usize) {
        if !self.spawn_piece(idx) {
            self.end_if_decided();
        }
    }

    fn end_if_decided(&mut self) {
        if self.active_count() <= 1 {
            self.end_game();
        }
    }

    fn end_game(&mut self) {
        self.events.push(GameEvent::GameOver);
        self.status = GameStatus::Finished;

        self.winner = match self.mode {
            GameMode::Solo => self.players.first().map(|p| p.name.clone()),
            GameMode::Multiplayer => {
                let mut alive = self.players.iter().filter(|p| p.is_active());
                match (alive.next(), alive.next()) {
                    (Some(survivor), None) => Some(survivor.name.clone()),
                    _ => self
                        .players
                        .iter()
                        .min_by_key(|p| Reverse(p.score))
                        .map(|p| p.name.clone()),
                }
            }
        };
        info!(
            "round finished: mode={} winner={}",
            self.mode.as_str(),
            self.winner.as_deref().unwrap_or("-")
        );

        match self.mode {
            GameMode::Solo => {
                for player in &self.players {
                    self.scores.add_score(ScoreEntry {
                        name: player.name.clone(),
                        score: player.score,
                        difficulty: self.difficulty,
                    });
                }
            }
            GameMode::Multiplayer => {
                self.last_result = Some(GameResult {
                    winner: self.winner.clone(),
                    mode: self.mode,
                    difficulty: self.difficulty,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                    players: self.players.iter().map(ResultEntry::from).collect(),
                });
                self.status = GameStatus::Lobby;
            }
        }
    }

    /// Add a player to the room. Refused while a round runs or when the room is full.
    ///
    /// A name already taken in the room gets a ` (2)`, ` (3)`, ... suffix.
    pub fn add_player(&mut self, info: PlayerInfo) -> Result<(), JoinError> {
        if self.status == GameStatus::Playing {
            return Err(JoinError::GameInProgress);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(JoinError::RoomFull);
        }
        let name = self.unique_name(&info.name);
        self.players.push(PlayerState::new(info.id, name, false));
        Ok(())
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.players.iter().any(|p| p.name == name);
        if !taken(base) {
            return base.to_string();
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base} ({suffix})");
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Idempotent by id
    pub fn add_spectator(&mut self, info: PlayerInfo) {
        if !self.has_spectator(&info.id) {
            self.spectators.push(info);
        }
    }

    /// Remove a player, migrating the host role and ending a round left with one player.
    ///
    /// Returns the number of players left.
    pub fn remove_player(&mut self, id: &str) -> usize {
        let Some(idx) = self.index_of(id) else {
            return self.players.len();
        };
        let removed = self.players.remove(idx);

        if removed.is_host {
            if let Some(next) = self.players.first_mut() {
                next.is_host = true;
                info!("host migrated to {}", next.name);
            }
        }

        if self.status == GameStatus::Playing && self.players.len() == 1 {
            self.end_game();
        }

        self.players.len()
    }

    pub fn remove_spectator(&mut self, id: &str) {
        self.spectators.retain(|s| s.id != id);
    }

    /// Current projection of the room. Drains the pending events.
    pub fn snapshot(&mut self) -> GameSnapshot {
        let mut players = Vec::with_capacity(self.players.len());
        for player in &self.players {
            let next_pieces = (0..NEXT_PIECE_COUNT)
                .map(|offset| NextPiece::from(self.sequence.peek(player.piece_index + offset)))
                .collect();
            players.push(PlayerSnapshot::new(player, next_pieces));
        }

        GameSnapshot {
            status: self.status,
            winner: self.winner.clone(),
            game_mode: self.mode,
            level: self.progress.level,
            lines_to_next_level: self.progress.lines_to_next_level,
            lines_per_level: self.progress.lines_per_level,
            players,
            spectators: self.spectators.clone(),
            events: std::mem::take(&mut self.events),
            last_result: self.last_result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::Shape;
    use crate::types::Cell;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<ScoreEntry>>);

    impl ScoreSink for RecordingSink {
        fn add_score(&self, entry: ScoreEntry) {
            self.0.lock().unwrap().push(entry);
        }
    }

    fn solo() -> Game {
        Game::with_seed(PlayerInfo::new("p1", "Ana"), GameMode::Solo, Difficulty::Normal, 1)
    }

    fn duo() -> Game {
        let mut game = Game::with_seed(
            PlayerInfo::new("a", "Ana"),
            GameMode::Multiplayer,
            Difficulty::Normal,
            2,
        );
        game.add_player(PlayerInfo::new("b", "Bo")).unwrap();
        game
    }

    fn dot() -> Piece {
        Piece {
            kind: PieceKind::T,
            shape: Shape::from_rows(&[&[1]]),
            x: 0,
            y: 0,
        }
    }

    /// Fill the bottom three rows except column 0 and hard drop a bar into the gap
    fn triple_clear(game: &mut Game, id: &str) -> GameSnapshot {
        let player = game.player_mut(id).unwrap();
        for y in 17..20 {
            for x in 1..10 {
                player.board.set(x, y, Cell::Block(PieceKind::J));
            }
        }
        player.active = Some(Piece {
            shape: Shape::from_rows(&[&[1, 0, 0], &[1, 0, 0], &[1, 0, 0]]),
            ..dot()
        });
        game.handle_player_action(id, PlayerAction::HardDrop)
    }

    #[test]
    fn new_room_waits_in_lobby() {
        let mut game = solo();
        assert_eq!(game.status(), GameStatus::Lobby);
        assert!(game.players()[0].is_host);
        let snap = game.tick(5_000);
        assert_eq!(snap.status, GameStatus::Lobby);
        assert!(snap.players[0].active_piece.is_none());
    }

    #[test]
    fn start_spawns_for_every_player() {
        let mut game = duo();
        let snap = game.start_game();
        assert_eq!(snap.status, GameStatus::Playing);
        for player in &snap.players {
            let piece = player.active_piece.as_ref().unwrap();
            assert_eq!(piece.position.y, 0);
            assert_eq!(player.next_pieces.len(), 3);
        }
        assert_eq!(game.sequence().len(), 14);
        assert_eq!(
            snap.players[0].active_piece.as_ref().unwrap().kind,
            snap.players[1].active_piece.as_ref().unwrap().kind
        );
    }

    #[test]
    fn start_is_noop_outside_lobby() {
        let mut game = solo();
        game.start_game();
        game.player_mut("p1").unwrap().score = 77;
        game.start_game();
        assert_eq!(game.player("p1").unwrap().score, 77);
    }

    #[test]
    fn gravity_waits_for_interval() {
        let mut game = solo();
        game.start_game();
        game.tick(500);
        assert_eq!(game.player("p1").unwrap().active.unwrap().y, 0);
        game.tick(1_000);
        assert_eq!(game.player("p1").unwrap().active.unwrap().y, 1);
        game.tick(1_500);
        assert_eq!(game.player("p1").unwrap().active.unwrap().y, 1);
        assert_eq!(game.player("p1").unwrap().score, 0);
    }

    #[test]
    fn soft_drop_falls_once_and_scores_in_solo() {
        let mut game = solo();
        game.start_game();
        game.handle_player_action("p1", PlayerAction::SoftDrop);
        assert_eq!(game.player("p1").unwrap().active.unwrap().y, 0);

        game.tick(10);
        let player = game.player("p1").unwrap();
        assert_eq!(player.active.unwrap().y, 1);
        assert_eq!(player.score, 1);
        assert!(!player.soft_drop_requested);

        game.tick(20);
        assert_eq!(game.player("p1").unwrap().active.unwrap().y, 1);
    }

    #[test]
    fn moves_respect_walls() {
        let mut game = solo();
        game.start_game();
        for _ in 0..10 {
            game.handle_player_action("p1", PlayerAction::MoveLeft);
        }
        let piece = game.player("p1").unwrap().active.unwrap();
        let min_x = piece.cells().map(|(x, _)| x).min().unwrap();
        assert_eq!(min_x, 0);

        let snap = game.handle_player_action("p1", PlayerAction::MoveLeft);
        assert!(snap.events.is_empty());
        let snap = game.handle_player_action("p1", PlayerAction::MoveRight);
        assert_eq!(snap.events, vec![GameEvent::Move]);
    }

    #[test]
    fn rotation_kicks_off_the_wall() {
        let mut game = solo();
        game.start_game();
        // Vertical I hugging the left wall: its column is 2 cells into the matrix.
        let vertical = Piece::spawned(PieceKind::I);
        let vertical = Piece {
            shape: vertical.shape.rotated_cw(),
            x: -2,
            y: 5,
            ..vertical
        };
        assert!(vertical.is_valid(&game.player("p1").unwrap().board));
        game.player_mut("p1").unwrap().active = Some(vertical);

        let snap = game.handle_player_action("p1", PlayerAction::Rotate);
        assert_eq!(snap.events, vec![GameEvent::Rotate]);
        let piece = game.player("p1").unwrap().active.unwrap();
        // (0,0) and (-1,0) collide with the wall; (+1,0) is not enough either.
        assert_eq!(piece.x, 0);
        assert_eq!(piece.shape, vertical.shape.rotated_cw());
    }

    #[test]
    fn rotation_without_room_changes_nothing() {
        let mut game = solo();
        game.start_game();
        let player = game.player_mut("p1").unwrap();
        for y in 0..20 {
            for x in 0..10 {
                if !(3..=5).contains(&x) || y > 1 {
                    player.board.set(x, y, Cell::Penalty);
                }
            }
        }
        let flat_t = Piece {
            x: 3,
            y: 0,
            ..Piece::new(PieceKind::T)
        };
        player.active = Some(flat_t);

        let snap = game.handle_player_action("p1", PlayerAction::Rotate);
        assert!(snap.events.is_empty());
        assert_eq!(game.player("p1").unwrap().active, Some(flat_t));
    }

    #[test]
    fn o_piece_never_rotates() {
        let mut game = solo();
        game.start_game();
        let o = Piece::spawned(PieceKind::O);
        game.player_mut("p1").unwrap().active = Some(o);
        let snap = game.handle_player_action("p1", PlayerAction::Rotate);
        assert!(snap.events.is_empty());
        assert_eq!(game.player("p1").unwrap().active, Some(o));
    }

    #[test]
    fn hard_drop_scores_twice_the_distance() {
        let mut game = solo();
        game.start_game();
        game.player_mut("p1").unwrap().active = Some(Piece::spawned(PieceKind::I));

        let snap = game.handle_player_action("p1", PlayerAction::HardDrop);

        // The I's filled row is row 1 of its matrix, so the anchor lands on row 18.
        let player = game.player("p1").unwrap();
        assert_eq!(player.score, 18 * 2);
        for x in 3..7 {
            assert_eq!(player.board.get(x, 19), Some(Cell::Block(PieceKind::I)));
        }
        assert_eq!(player.active.unwrap().y, 0);
        assert_eq!(
            snap.events,
            vec![GameEvent::HardDrop, GameEvent::PieceLock]
        );
    }

    #[test]
    fn single_clear_in_solo() {
        let mut game = solo();
        game.start_game();
        let player = game.player_mut("p1").unwrap();
        for x in 0..10 {
            if x != 5 {
                player.board.set(x, 19, Cell::Block(PieceKind::L));
            }
        }
        player.active = Some(Piece { x: 5, y: 19, ..dot() });

        game.tick(1_000);

        let player = game.player("p1").unwrap();
        assert_eq!(player.score, 40);
        assert!(player.board.is_empty());
        assert_eq!(game.lines_to_next_level(), 4);
    }

    #[test]
    fn double_clear_sends_one_penalty_row() {
        let mut game = duo();
        game.start_game();
        let attacker = game.player_mut("a").unwrap();
        for y in 18..20 {
            for x in 0..10 {
                if x != 0 {
                    attacker.board.set(x, y, Cell::Block(PieceKind::J));
                }
            }
        }
        attacker.active = Some(Piece {
            shape: Shape::from_rows(&[&[1, 0], &[1, 0]]),
            x: 0,
            y: 0,
            ..dot()
        });
        let victim = game.player_mut("b").unwrap();
        victim.active = Some(Piece { y: 4, ..victim.active.unwrap() });

        let snap = game.handle_player_action("a", PlayerAction::HardDrop);

        assert!(snap.events.contains(&GameEvent::LineClear));
        let attacker = game.player("a").unwrap();
        assert!(attacker.board.is_empty());
        assert_eq!(attacker.score, 0);
        let victim = game.player("b").unwrap();
        let rows = victim.board.rows();
        assert_eq!(rows[19], [Cell::Penalty; 10]);
        assert!(rows[18].iter().all(Cell::is_empty));
        assert_eq!(victim.active.unwrap().y, 3);
    }

    #[test]
    fn solo_top_out_finishes_and_records_score() {
        let sink = Arc::new(RecordingSink::default());
        let mut game = Game::new(
            PlayerInfo::new("p1", "Ana"),
            GameMode::Solo,
            Difficulty::Fast,
            PieceSequence::seeded(3),
            sink.clone(),
        );
        game.start_game();
        let player = game.player_mut("p1").unwrap();
        player.score = 250;
        for y in 1..20 {
            for x in 0..9 {
                player.board.set(x, y, Cell::Penalty);
            }
        }

        let snap = game.handle_player_action("p1", PlayerAction::HardDrop);

        assert_eq!(snap.status, GameStatus::Finished);
        assert_eq!(snap.winner.as_deref(), Some("Ana"));
        assert!(snap.events.contains(&GameEvent::GameOver));
        assert!(snap.players[0].has_lost);
        assert!(snap.players[0].active_piece.is_none());
        let recorded = sink.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].difficulty, Difficulty::Fast);
        assert!(recorded[0].score >= 250);
    }

    #[test]
    fn add_player_rules() {
        let mut game = duo();
        game.add_player(PlayerInfo::new("c", "Ana")).unwrap();
        game.add_player(PlayerInfo::new("d", "Ana")).unwrap();
        let names: Vec<_> = game.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bo", "Ana (2)", "Ana (3)"]);
        assert!(!game.players()[2].is_host);

        assert_eq!(game.add_player(PlayerInfo::new("e", "Eve")), Err(JoinError::RoomFull));
        assert_eq!(game.players().len(), 4);
    }

    #[test]
    fn cannot_join_a_running_round() {
        let mut game = duo();
        game.start_game();
        assert_eq!(
            game.add_player(PlayerInfo::new("c", "Cy")),
            Err(JoinError::GameInProgress)
        );
    }

    #[test]
    fn spectators_are_idempotent() {
        let mut game = solo();
        game.add_spectator(PlayerInfo::new("s", "Sam"));
        game.add_spectator(PlayerInfo::new("s", "Sam"));
        assert_eq!(game.spectators().len(), 1);
        game.remove_spectator("s");
        game.remove_spectator("s");
        assert!(game.spectators().is_empty());
    }

    #[test]
    fn host_leaving_mid_round_ends_it() {
        let mut game = duo();
        game.start_game();
        game.player_mut("b").unwrap().score = 5;

        assert_eq!(game.remove_player("a"), 1);

        let host = game.host().unwrap();
        assert_eq!(host.id, "b");
        assert_eq!(game.snapshot().host().map(|p| p.name.as_str()), Some("Bo"));
        assert_eq!(game.status(), GameStatus::Lobby);
        assert_eq!(game.winner(), Some("Bo"));
        let result = game.last_result().unwrap();
        assert_eq!(result.players.len(), 1);
        assert_eq!(result.mode, GameMode::Multiplayer);
    }

    #[test]
    fn remove_unknown_player_reports_count() {
        let mut game = duo();
        assert_eq!(game.remove_player("zzz"), 2);
    }

    #[test]
    fn actions_ignored_for_unknown_players_and_outside_rounds() {
        let mut game = duo();
        let before = game.snapshot();
        let after = game.handle_player_action("a", PlayerAction::HardDrop);
        assert_eq!(before, after);

        game.start_game();
        let snap = game.handle_player_action("ghost", PlayerAction::MoveLeft);
        assert!(snap.events.is_empty());
    }

    #[test]
    fn events_are_consumed_once() {
        let mut game = solo();
        game.start_game();
        let snap = game.handle_player_action("p1", PlayerAction::HardDrop);
        assert!(!snap.events.is_empty());
        assert!(game.snapshot().events.is_empty());
    }

    #[test]
    fn multiplayer_tie_goes_to_first_player() {
        let mut game = duo();
        game.add_player(PlayerInfo::new("c", "Cy")).unwrap();
        game.start_game();
        for id in ["a", "b"] {
            let player = game.player_mut(id).unwrap();
            player.has_lost = true;
            player.score = 10;
        }
        game.player_mut("c").unwrap().score = 3;
        game.end_game();
        assert_eq!(game.winner(), Some("Cy"));

        game.start_game();
        for id in ["a", "b", "c"] {
            let player = game.player_mut(id).unwrap();
            player.has_lost = true;
            player.score = if id == "a" { 1 } else { 10 };
        }
        game.end_game();
        assert_eq!(game.winner(), Some("Bo"));
    }

    #[test]
    fn restart_resets_scores_and_sequence() {
        let mut game = solo();
        game.start_game();
        game.handle_player_action("p1", PlayerAction::HardDrop);
        assert!(game.player("p1").unwrap().score > 0);

        let snap = game.restart();
        assert_eq!(snap.status, GameStatus::Playing);
        assert_eq!(snap.players[0].score, 0);
        assert_eq!(game.player("p1").unwrap().piece_index, 1);
        assert_eq!(game.sequence().len(), 14);
    }

    #[test]
    fn restart_keeps_level_progress() {
        let mut game = solo();
        game.start_game();
        triple_clear(&mut game, "p1");
        triple_clear(&mut game, "p1");
        assert_eq!(game.level(), 2);
        assert_eq!(game.lines_to_next_level(), 4);

        let snap = game.restart();
        assert_eq!(snap.level, 2);
        assert_eq!(snap.lines_to_next_level, 4);
        assert_eq!(game.level(), 2);

        // A fresh start from the lobby goes back to the difficulty's level.
        let mut game = duo();
        game.start_game();
        triple_clear(&mut game, "a");
        triple_clear(&mut game, "a");
        assert_eq!(game.level(), 2);
        game.end_game();
        assert_eq!(game.status(), GameStatus::Lobby);
        let snap = game.start_game();
        assert_eq!(snap.level, 1);
        assert_eq!(snap.lines_to_next_level, 5);
    }

    #[test]
    fn level_up_from_clears_carries_leftover_lines() {
        let mut game = solo();
        game.start_game();

        let snap = triple_clear(&mut game, "p1");
        assert!(snap.events.contains(&GameEvent::LineClear));
        assert_eq!(snap.level, 1);
        assert_eq!(snap.lines_to_next_level, 2);
        assert_eq!(
            snap.players[0].score,
            line_clear_score(3) + hard_drop_score(17)
        );

        let snap = triple_clear(&mut game, "p1");
        assert_eq!(snap.level, 2);
        assert_eq!(snap.lines_to_next_level, 4);
        assert_eq!(snap.lines_per_level, 5);
        assert!(game.player("p1").unwrap().board.is_empty());
    }

    #[test]
    fn triple_clear_sends_two_rows_to_active_opponents_only() {
        let mut game = duo();
        game.add_player(PlayerInfo::new("c", "Cy")).unwrap();
        game.start_game();
        game.player_mut("c").unwrap().has_lost = true;

        triple_clear(&mut game, "a");

        let bo = game.player("b").unwrap().board.rows();
        assert_eq!(bo[19], [Cell::Penalty; 10]);
        assert_eq!(bo[18], [Cell::Penalty; 10]);
        assert!(bo[17].iter().all(Cell::is_empty));
        assert!(game.player("c").unwrap().board.is_empty());
        assert!(game.player("a").unwrap().board.is_empty());
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn rotation_prefers_left_kick_over_right() {
        let mut game = solo();
        game.start_game();
        let player = game.player_mut("p1").unwrap();
        let piece = Piece {
            shape: Shape::from_rows(&[&[0, 1, 0], &[1, 1, 1], &[0, 0, 0]]),
            x: 4,
            y: 10,
            ..dot()
        };
        // Rotated in place the stem reaches (5, 12); both side kicks stay clear of it.
        player.board.set(5, 12, Cell::Penalty);
        player.active = Some(piece);
        let rotated = Piece {
            shape: piece.shape.rotated_cw(),
            ..piece
        };
        assert!(!rotated.is_valid(&player.board));
        assert!(rotated.shifted(-1, 0).is_valid(&player.board));
        assert!(rotated.shifted(1, 0).is_valid(&player.board));

        let snap = game.handle_player_action("p1", PlayerAction::Rotate);

        assert_eq!(snap.events, vec![GameEvent::Rotate]);
        let active = game.player("p1").unwrap().active.unwrap();
        assert_eq!((active.x, active.y), (3, 10));
        assert_eq!(active.shape, rotated.shape);
    }

    #[test]
    fn gravity_lock_that_cannot_spawn_ends_a_solo_round() {
        let sink = Arc::new(RecordingSink::default());
        let mut game = Game::new(
            PlayerInfo::new("p1", "Ana"),
            GameMode::Solo,
            Difficulty::Normal,
            PieceSequence::seeded(5),
            sink.clone(),
        );
        game.start_game();
        let player = game.player_mut("p1").unwrap();
        for y in 1..20 {
            for x in 0..9 {
                player.board.set(x, y, Cell::Penalty);
            }
        }
        // Resting on the stack: the next gravity step locks it.
        player.active = Some(Piece { x: 4, y: 0, ..dot() });

        let snap = game.tick(999);
        assert_eq!(snap.status, GameStatus::Playing);
        assert!(snap.events.is_empty());

        let snap = game.tick(1_000);
        assert_eq!(snap.status, GameStatus::Finished);
        assert_eq!(snap.events, vec![GameEvent::PieceLock, GameEvent::GameOver]);
        assert!(snap.players[0].has_lost);
        assert_eq!(snap.winner.as_deref(), Some("Ana"));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }
}
