//! SyncPair - One configured source/destination relationship

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transfer direction of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Pull destination into source without deleting, then push source to
    /// destination deleting stale files
    Bidirectional,

    /// Push source to destination only, never deleting
    #[default]
    OneWay,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bidirectional => "bidirectional",
            Direction::OneWay => "one-way",
        }
    }
}

/// A named source/destination pair with its own transfer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncPair {
    pub name: String,

    /// Absolute path or `${root}/rest`
    pub source: PathBuf,

    /// Absolute path or `${root}/rest`
    pub destination: PathBuf,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub direction: Direction,

    /// Extra rsync flags, applied after the global ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rsync_options: Vec<String>,

    /// Pair-specific exclude globs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,

    /// Explicit deletion policy; `None` follows the direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl SyncPair {
    /// Create an enabled one-way pair with no extra options
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
            enabled: true,
            direction: Direction::OneWay,
            rsync_options: Vec::new(),
            excludes: Vec::new(),
            delete: None,
            description: None,
        }
    }

    /// Builder-style direction setter
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Whether the push leg removes destination files missing from source
    pub fn deletes_destination(&self) -> bool {
        match self.delete {
            Some(delete) => delete,
            None => self.direction == Direction::Bidirectional,
        }
    }

    /// Whether anything in the options asks for destination deletion
    pub fn implies_deletion(&self) -> bool {
        self.delete == Some(true) || self.rsync_options.iter().any(|opt| is_delete_flag(opt))
    }
}

/// rsync flags that remove files on the receiving side
pub fn is_delete_flag(option: &str) -> bool {
    option == "--del" || option.starts_with("--delete")
}
