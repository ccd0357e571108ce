//! Red Tetris room server (default binary).
//!
//! Configuration comes from `RED_TETRIS_*` environment variables; command-line flags
//! override them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use red_tetris::adapter::{run_server, ServerConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Room tick period in milliseconds
    #[clap(short, long)]
    tick_ms: Option<u64>,
    /// Queued commands per room before actions are refused
    #[clap(long)]
    max_pending: Option<usize>,
    /// JSON-lines file that stores finished scores
    #[clap(short, long)]
    leaderboard: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(tick_ms) = self.tick_ms.filter(|&ms| ms > 0) {
            config.tick_ms = tick_ms;
        }
        if let Some(max_pending) = self.max_pending {
            config.max_pending_commands = max_pending;
        }
        if let Some(path) = self.leaderboard {
            config.leaderboard_path = Some(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().apply(ServerConfig::from_env());

    tokio::select! {
        result = run_server(config, None) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
