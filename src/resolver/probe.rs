//! Host environment probing

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Read-only view of the host filesystem and user environment
///
/// Every presence check in the crate goes through this trait so that
/// resolution and default generation can be tested without real mounts.
pub trait EnvironmentProbe {
    /// Whether `path` currently exists and is a directory
    fn is_dir(&self, path: &Path) -> bool;

    fn home_dir(&self) -> Option<PathBuf>;

    fn user_name(&self) -> Option<String>;

    /// Names of the subdirectories of `path`, sorted. Empty when unreadable.
    fn list_dirs(&self, path: &Path) -> Vec<String>;
}

/// Probe backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl EnvironmentProbe for HostProbe {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn user_name(&self) -> Option<String> {
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|name| !name.is_empty())
    }

    fn list_dirs(&self, path: &Path) -> Vec<String> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}
