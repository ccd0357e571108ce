//! File-backed leaderboard
//!
//! Scores are appended as JSON lines by a background writer task, so recording a
//! score never blocks a room. The full list is also kept in memory for reads.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use red_tetris_core::{ScoreEntry, ScoreSink};
use red_tetris_types::Difficulty;

/// Entries returned when no limit is given
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// One persisted line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScore {
    pub name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub date: DateTime<Utc>,
    pub weighted_score: u64,
}

/// Ranking multiplier per difficulty
pub fn difficulty_weight(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Hardcore => 2.0,
        Difficulty::Fast => 1.5,
        Difficulty::Normal => 1.0,
    }
}

pub fn weighted_score(score: u32, difficulty: Difficulty) -> u64 {
    (f64::from(score) * difficulty_weight(difficulty)).floor() as u64
}

/// Best `limit` scores by weighted score, highest first. Ties keep insertion order.
pub fn rank(scores: &[StoredScore], limit: usize) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = scores
        .iter()
        .map(|s| LeaderboardEntry {
            name: s.name.clone(),
            score: s.score,
            difficulty: s.difficulty,
            date: s.date,
            weighted_score: weighted_score(s.score, s.difficulty),
        })
        .collect();
    entries.sort_by(|a, b| b.weighted_score.cmp(&a.weighted_score));
    entries.truncate(limit);
    entries
}

enum WriterMsg {
    Append(StoredScore),
    Flush(oneshot::Sender<()>),
}

pub struct FileLeaderboard {
    path: PathBuf,
    scores: Arc<Mutex<Vec<StoredScore>>>,
    tx: mpsc::UnboundedSender<WriterMsg>,
}

impl FileLeaderboard {
    /// Load `path` (missing file = empty board) and start the writer task.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut scores = Vec::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                for (lineno, line) in contents.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StoredScore>(line) {
                        Ok(score) => scores.push(score),
                        Err(e) => warn!("{}:{}: skipping bad score line: {}", path.display(), lineno + 1, e),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("leaderboard {} loaded with {} scores", path.display(), scores.len());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<WriterMsg>();
        let writer_path = path.clone();
        tokio::spawn(async move {
            let mut buf: Vec<u8> = Vec::with_capacity(256);
            while let Some(msg) = rx.recv().await {
                match msg {
                    WriterMsg::Append(score) => {
                        buf.clear();
                        if let Err(e) = serde_json::to_writer(&mut buf, &score) {
                            warn!("cannot encode score for {}: {}", score.name, e);
                            continue;
                        }
                        buf.push(b'\n');
                        if let Err(e) = file.write_all(&buf).await {
                            warn!("cannot write {}: {}", writer_path.display(), e);
                        }
                    }
                    WriterMsg::Flush(done) => {
                        if let Err(e) = file.flush().await {
                            warn!("cannot flush {}: {}", writer_path.display(), e);
                        }
                        let _ = done.send(());
                    }
                }
            }
            let _ = file.flush().await;
        });

        Ok(Self {
            path,
            scores: Arc::new(Mutex::new(scores)),
            tx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Top `limit` entries (10 when `None`)
    pub fn get_leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let scores = self.scores.lock().unwrap_or_else(|e| e.into_inner());
        rank(&scores, limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT))
    }

    pub fn len(&self) -> usize {
        self.scores.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every score recorded so far has reached the file
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriterMsg::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl ScoreSink for FileLeaderboard {
    fn add_score(&self, entry: ScoreEntry) {
        if entry.score == 0 {
            return;
        }
        let stored = StoredScore {
            name: entry.name,
            score: entry.score,
            difficulty: entry.difficulty,
            date: Utc::now(),
        };
        info!(
            "score {} for {} ({}) recorded",
            stored.score,
            stored.name,
            stored.difficulty.as_str()
        );
        self.scores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(stored.clone());
        if self.tx.send(WriterMsg::Append(stored)).is_err() {
            warn!("leaderboard writer stopped; score kept in memory only");
        }
    }
}
