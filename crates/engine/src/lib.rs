//! Room runtime
//!
//! Turns the synchronous [`red_tetris_core::Game`] into running rooms: one tokio task
//! per room serializes ticks and commands, and a registry maps room names to their
//! task handles.

pub mod error;
pub mod registry;
pub mod room;

pub use error::RoomError;
pub use registry::{Joined, RoomRegistry};
pub use room::{Role, RoomCommand, RoomConfig, RoomHandle, RoomSummary};
