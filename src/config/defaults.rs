//! First-run configuration generated from the host environment

use super::Configuration;
use crate::resolver::EnvironmentProbe;
use crate::types::{Direction, SyncPair};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Mount point checked before the home-directory fallback
const NETWORK_ROOT: &str = "/mnt/sync";

/// Fallback under the user's home directory
const LOCAL_ROOT: &str = "sync";

const DEFAULT_EXCLUDES: &[&str] = &[
    "*.tmp",
    "*.log",
    ".DS_Store",
    "Thumbs.db",
    "__pycache__",
    "*.pyc",
];

const DEFAULT_RSYNC_OPTIONS: &[&str] = &["--no-perms", "--no-group"];

/// Volumes that are never removable media
const SYSTEM_VOLUMES: &[&str] = &[
    "Macintosh HD",
    "Recovery",
    "Preboot",
    "com.apple.TimeMachine.localsnapshots",
];

/// Build a configuration from what the host currently has mounted.
///
/// Roots:
/// - `local`: the network mount, then `$HOME/sync`
/// - `removable`: every volume under `/media/$USER`, then under `/Volumes`
///
/// One bidirectional pair is generated for each directory on the first
/// removable volume that is present.
pub fn generate_default(probe: &dyn EnvironmentProbe) -> Configuration {
    let mut local = vec![PathBuf::from(NETWORK_ROOT)];
    if let Some(home) = probe.home_dir() {
        local.push(home.join(LOCAL_ROOT));
    }

    let removable = removable_volumes(probe);
    let active_volume = removable.iter().find(|volume| probe.is_dir(volume));

    let sync_pairs: Vec<SyncPair> = active_volume
        .map(|volume| {
            probe
                .list_dirs(volume)
                .into_iter()
                .filter(|name| !name.starts_with('.'))
                .map(|name| {
                    SyncPair::new(
                        name.clone(),
                        format!("${{local}}/{}", name),
                        format!("${{removable}}/{}", name),
                    )
                    .with_direction(Direction::Bidirectional)
                })
                .collect()
        })
        .unwrap_or_default();

    let mut roots = BTreeMap::new();
    roots.insert("local".to_string(), local);
    roots.insert("removable".to_string(), removable);

    Configuration {
        roots,
        sync_pairs,
        global_excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        global_rsync_options: DEFAULT_RSYNC_OPTIONS.iter().map(|s| s.to_string()).collect(),
        log_directory: PathBuf::from("logs"),
    }
}

fn removable_volumes(probe: &dyn EnvironmentProbe) -> Vec<PathBuf> {
    let mut mount_dirs = Vec::new();
    if let Some(user) = probe.user_name() {
        mount_dirs.push(PathBuf::from("/media").join(user));
    }
    mount_dirs.push(PathBuf::from("/Volumes"));

    mount_dirs
        .into_iter()
        .filter(|dir| probe.is_dir(dir))
        .flat_map(|dir| {
            probe
                .list_dirs(&dir)
                .into_iter()
                .filter(|name| !SYSTEM_VOLUMES.contains(&name.as_str()))
                .map(move |name| dir.join(name))
                .collect::<Vec<_>>()
        })
        .collect()
}
