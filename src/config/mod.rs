//! Configuration management
//!
//! The configuration is a human-editable JSON document. It is read fresh on
//! every invocation, generated on first run, and only ever rewritten when the
//! operator explicitly asks for a change.

mod cli;
mod defaults;

pub use cli::{Action, Cli, RunOptions};
pub use defaults::generate_default;

use crate::resolver::EnvironmentProbe;
use crate::types::{is_delete_flag, Direction, SyncError, SyncPair};
use globset::{ErrorKind as GlobErrorKind, Glob};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "sync_config.json";

/// Root document of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Root alias -> ordered candidate locations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub roots: BTreeMap<String, Vec<PathBuf>>,

    pub sync_pairs: Vec<SyncPair>,

    #[serde(default)]
    pub global_excludes: Vec<String>,

    #[serde(default)]
    pub global_rsync_options: Vec<String>,

    /// Relative values are taken from the configuration file's directory
    pub log_directory: PathBuf,
}

impl Configuration {
    /// A configuration with no pairs and no roots
    pub fn empty() -> Self {
        Self {
            roots: BTreeMap::new(),
            sync_pairs: Vec::new(),
            global_excludes: Vec::new(),
            global_rsync_options: Vec::new(),
            log_directory: PathBuf::from("logs"),
        }
    }

    /// Parse and validate a configuration document
    pub fn parse(text: &str) -> Result<Self, SyncError> {
        let config: Configuration = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String, SyncError> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    /// Check every invariant; the first violation is reported
    pub fn validate(&self) -> Result<(), SyncError> {
        for (alias, candidates) in &self.roots {
            if alias.is_empty() || alias.contains(['$', '{', '}', '/']) {
                return Err(SyncError::Config(format!("invalid root name '{}'", alias)));
            }
            if let Some(relative) = candidates.iter().find(|c| !c.is_absolute()) {
                return Err(SyncError::Config(format!(
                    "root '{}' candidate {} is not an absolute path",
                    alias,
                    relative.display()
                )));
            }
        }

        let mut seen = HashSet::new();
        for pair in &self.sync_pairs {
            if pair.name.trim().is_empty() {
                return Err(SyncError::Config("sync pair with empty name".to_string()));
            }
            if !seen.insert(pair.name.as_str()) {
                return Err(SyncError::Config(format!(
                    "duplicate sync pair name '{}'",
                    pair.name
                )));
            }
            self.validate_path(pair, "source", &pair.source)?;
            self.validate_path(pair, "destination", &pair.destination)?;
            if pair.source == pair.destination {
                return Err(SyncError::Config(format!(
                    "sync pair '{}': source and destination cannot be the same",
                    pair.name
                )));
            }
            if pair.direction == Direction::OneWay && pair.implies_deletion() {
                return Err(SyncError::Config(format!(
                    "sync pair '{}': one-way pairs must not delete destination files",
                    pair.name
                )));
            }
            validate_excludes(&pair.excludes)?;
        }

        validate_excludes(&self.global_excludes)?;
        if let Some(flag) = self.global_rsync_options.iter().find(|o| is_delete_flag(o)) {
            return Err(SyncError::Config(format!(
                "global option {} is not allowed; deletion is decided per pair",
                flag
            )));
        }

        Ok(())
    }

    fn validate_path(&self, pair: &SyncPair, role: &str, path: &Path) -> Result<(), SyncError> {
        match split_root(path) {
            Some((alias, _)) if !self.roots.contains_key(alias) => Err(SyncError::Config(format!(
                "sync pair '{}': {} refers to unknown root '{}'",
                pair.name, role, alias
            ))),
            Some(_) => Ok(()),
            None if path.is_absolute() => Ok(()),
            None => Err(SyncError::Config(format!(
                "sync pair '{}': {} {} is not an absolute path",
                pair.name,
                role,
                path.display()
            ))),
        }
    }

    /// Look up a pair by name
    pub fn pair(&self, name: &str) -> Option<&SyncPair> {
        self.sync_pairs.iter().find(|pair| pair.name == name)
    }

    /// Copy of this configuration with one pair's enabled flag changed
    pub fn with_enabled(&self, name: &str, enabled: bool) -> Result<Self, SyncError> {
        let mut updated = self.clone();
        let pair = updated
            .sync_pairs
            .iter_mut()
            .find(|pair| pair.name == name)
            .ok_or_else(|| SyncError::UnknownPair(name.to_string()))?;
        pair.enabled = enabled;
        Ok(updated)
    }
}

/// Split `${alias}/rest` into its alias and remainder
pub fn split_root(path: &Path) -> Option<(&str, &Path)> {
    let mut components = path.components();
    let Component::Normal(first) = components.next()? else {
        return None;
    };
    let alias = first.to_str()?.strip_prefix("${")?.strip_suffix('}')?;
    Some((alias, components.as_path()))
}

fn validate_excludes(patterns: &[String]) -> Result<(), SyncError> {
    for pattern in patterns {
        if pattern.trim().is_empty() {
            return Err(SyncError::Config("empty exclude pattern".to_string()));
        }
        // rsync accepts `**` inside a component; globset does not
        if let Err(e) = Glob::new(pattern) {
            if *e.kind() != GlobErrorKind::InvalidRecursive {
                return Err(SyncError::Config(format!(
                    "invalid exclude pattern '{}': {}",
                    pattern, e
                )));
            }
        }
    }
    Ok(())
}

/// Owner of the configuration file on disk
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the configuration, generating and saving a default on first run
    pub fn load(&self, probe: &dyn EnvironmentProbe) -> Result<Configuration, SyncError> {
        if self.exists() {
            return self.read();
        }
        let config = generate_default(probe);
        self.save(&config)?;
        tracing::info!("Generated default configuration at {}", self.path.display());
        Ok(config)
    }

    /// Like [`ConfigStore::load`] but never writes
    pub fn preview(&self, probe: &dyn EnvironmentProbe) -> Result<Configuration, SyncError> {
        if self.exists() {
            self.read()
        } else {
            Ok(generate_default(probe))
        }
    }

    /// Read and validate an existing configuration file
    pub fn read(&self) -> Result<Configuration, SyncError> {
        let text = fs::read_to_string(&self.path)?;
        Configuration::parse(&text).map_err(|e| match e {
            // Well-formed JSON with a misspelled or misplaced key
            SyncError::Json(json) if json.classify() == Category::Data => {
                SyncError::Config(format!("{}: {}", self.path.display(), json))
            }
            SyncError::Json(json) => SyncError::Config(format!(
                "{} is not valid JSON: {}",
                self.path.display(),
                json
            )),
            other => other,
        })
    }

    /// Validate, then write via a temporary file and rename
    pub fn save(&self, config: &Configuration) -> Result<(), SyncError> {
        config.validate()?;
        let text = config.to_json()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Resolve `log_directory` against the configuration file's directory
    pub fn log_directory(&self, config: &Configuration) -> PathBuf {
        if config.log_directory.is_absolute() {
            return config.log_directory.clone();
        }
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.join(&config.log_directory),
            None => config.log_directory.clone(),
        }
    }
}
