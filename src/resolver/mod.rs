//! Path resolution - maps configured paths to what is mounted right now
//!
//! A configured path is either absolute or `${root}/rest`, where `root` names
//! an ordered list of candidate locations in the configuration. Resolution
//! picks the first candidate that is present at the moment of the call;
//! nothing is cached across calls, so a flaky mount is re-checked every time.

mod probe;

pub use probe::{EnvironmentProbe, HostProbe};

use crate::config::{split_root, Configuration};
use crate::types::SyncPair;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which side of a pair could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    Source,
    Destination,
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRole::Source => f.write_str("source"),
            PathRole::Destination => f.write_str("destination"),
        }
    }
}

/// A pair whose paths were mapped to present physical locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub pair: SyncPair,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// False when the destination will be created by the executor
    pub destination_exists: bool,
}

/// Why a pair could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unavailable {
    pub role: PathRole,
    /// Configured path as written
    pub configured: PathBuf,
    /// Physical locations that were tried, in order
    pub tried: Vec<PathBuf>,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} is not available", self.role, self.configured.display())?;
        if !self.tried.is_empty() {
            let tried: Vec<String> = self.tried.iter().map(|p| p.display().to_string()).collect();
            write!(f, " (tried {})", tried.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedPair),
    Unavailable(Unavailable),
}

/// Resolves configured paths against the host environment
pub struct PathResolver<'a> {
    roots: &'a BTreeMap<String, Vec<PathBuf>>,
    probe: &'a dyn EnvironmentProbe,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a Configuration, probe: &'a dyn EnvironmentProbe) -> Self {
        Self {
            roots: &config.roots,
            probe,
        }
    }

    /// Resolve both sides of a pair
    pub fn resolve(&self, pair: &SyncPair) -> Resolution {
        let source_candidates = self.candidates(&pair.source);
        let Some(source) = source_candidates
            .iter()
            .find(|p| self.probe.is_dir(p))
            .cloned()
        else {
            return Resolution::Unavailable(Unavailable {
                role: PathRole::Source,
                configured: pair.source.clone(),
                tried: source_candidates,
            });
        };

        // An existing destination wins over one that would have to be created
        let destination_candidates = self.candidates(&pair.destination);
        let found = destination_candidates
            .iter()
            .find(|p| self.probe.is_dir(p))
            .map(|p| (p.clone(), true))
            .or_else(|| {
                destination_candidates
                    .iter()
                    .find(|p| p.parent().is_some_and(|parent| self.probe.is_dir(parent)))
                    .map(|p| (p.clone(), false))
            });
        let Some((destination, destination_exists)) = found else {
            return Resolution::Unavailable(Unavailable {
                role: PathRole::Destination,
                configured: pair.destination.clone(),
                tried: destination_candidates,
            });
        };

        Resolution::Resolved(ResolvedPair {
            pair: pair.clone(),
            source,
            destination,
            destination_exists,
        })
    }

    /// The first present candidate of a root alias
    pub fn resolve_root(&self, alias: &str) -> Option<PathBuf> {
        self.roots
            .get(alias)?
            .iter()
            .find(|candidate| self.probe.is_dir(candidate))
            .cloned()
    }

    /// Expand a configured path into its ordered physical candidates
    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        match split_root(path) {
            Some((alias, rest)) => self
                .roots
                .get(alias)
                .map(|roots| roots.iter().map(|root| join_rest(root, rest)).collect())
                .unwrap_or_default(),
            None => vec![path.to_path_buf()],
        }
    }

    /// Directories inside active roots that no pair references.
    ///
    /// Hidden directories and names matching a global exclude are ignored.
    pub fn untracked_directories(&self, config: &Configuration) -> Vec<PathBuf> {
        let excluded = exclude_matcher(&config.global_excludes);
        let mut untracked = Vec::new();

        for alias in self.roots.keys() {
            let Some(root) = self.resolve_root(alias) else {
                continue;
            };

            let tracked: BTreeSet<String> = config
                .sync_pairs
                .iter()
                .flat_map(|pair| [&pair.source, &pair.destination])
                .filter_map(|path| self.top_level_name(path, alias, &root))
                .collect();

            for name in self.probe.list_dirs(&root) {
                if name.starts_with('.') || tracked.contains(&name) || excluded.is_match(&name) {
                    continue;
                }
                untracked.push(root.join(name));
            }
        }

        untracked
    }

    /// First component below `root` that a configured path points into
    fn top_level_name(&self, path: &Path, alias: &str, root: &Path) -> Option<String> {
        let rest = match split_root(path) {
            Some((path_alias, rest)) if path_alias == alias => rest.to_path_buf(),
            Some(_) => return None,
            None => path.strip_prefix(root).ok()?.to_path_buf(),
        };
        rest.components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .map(str::to_string)
    }
}

fn join_rest(root: &Path, rest: &Path) -> PathBuf {
    if rest.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(rest)
    }
}

fn exclude_matcher(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}
