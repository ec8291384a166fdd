//! Core type definitions for pairsync

mod error;
mod outcome;
mod pair;

pub use error::SyncError;
pub use outcome::{Outcome, RunResult, TransferStats};
pub use pair::{is_delete_flag, Direction, SyncPair};
