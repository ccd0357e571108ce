//! Red Tetris (workspace facade crate).
//!
//! Re-exports `red_tetris::{adapter,core,engine,types}` while the implementation lives
//! in dedicated crates under `crates/`.

pub use red_tetris_adapter as adapter;
pub use red_tetris_core as core;
pub use red_tetris_engine as engine;
pub use red_tetris_types as types;
