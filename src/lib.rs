//! # pairsync - configuration-driven rsync for many directory pairs
//!
//! Reads a JSON list of sync pairs, resolves each pair's paths against the
//! storage roots present on this machine, and runs `rsync` once per pair
//! (twice for bidirectional pairs). Every run leaves a timestamped log.

pub mod commands;
pub mod config;
pub mod executor;
pub mod logging;
pub mod resolver;
pub mod runlog;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use commands::{RunController, RunReport};
pub use config::{ConfigStore, Configuration, RunOptions};
pub use types::{Direction, Outcome, RunResult, SyncError, SyncPair};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
