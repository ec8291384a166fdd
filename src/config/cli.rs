//! Command-line surface

use super::DEFAULT_CONFIG_FILE;
use crate::executor::SyncMode;
use crate::types::SyncError;
use clap::Parser;
use std::path::PathBuf;

/// Sync named directory pairs with rsync, driven by a JSON configuration
#[derive(Parser, Debug)]
#[command(name = "pairsync", version, about)]
pub struct Cli {
    /// Path to the configuration file (generated on first run)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// List all configured pairs with enabled/resolved status
    #[arg(long, conflicts_with_all = ["show", "enable", "disable"])]
    pub list: bool,

    /// Show resolved paths, excludes and transfer commands without running
    #[arg(long, conflicts_with_all = ["enable", "disable"])]
    pub show: bool,

    /// Enable a pair in the configuration file
    #[arg(long, value_name = "NAME", conflicts_with = "disable")]
    pub enable: Option<String>,

    /// Disable a pair in the configuration file
    #[arg(long, value_name = "NAME")]
    pub disable: Option<String>,

    /// Preview changes without making them
    #[arg(long)]
    pub dry_run: bool,

    /// Show rsync's own output
    #[arg(short, long)]
    pub verbose: bool,

    /// Compare file contents instead of size and modification time
    #[arg(long)]
    pub checksum: bool,

    /// Sync only the named pair
    #[arg(long, value_name = "NAME")]
    pub pair: Option<String>,

    /// rsync binary to run
    #[arg(long, value_name = "PATH", default_value = "rsync")]
    pub rsync: PathBuf,
}

/// What a single invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run,
    List,
    Show,
    SetEnabled { name: String, enabled: bool },
}

/// Validated invocation options
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub action: Action,
    pub mode: SyncMode,
    pub pair: Option<String>,
    pub rsync: PathBuf,
}

impl TryFrom<Cli> for RunOptions {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let action = if cli.list {
            Action::List
        } else if cli.show {
            Action::Show
        } else if let Some(name) = cli.enable {
            Action::SetEnabled {
                name,
                enabled: true,
            }
        } else if let Some(name) = cli.disable {
            Action::SetEnabled {
                name,
                enabled: false,
            }
        } else {
            Action::Run
        };

        if let Action::SetEnabled { name, .. } = &action {
            if name.trim().is_empty() {
                return Err(SyncError::Config("pair name must not be empty".to_string()));
            }
        }
        if cli.pair.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(SyncError::Config("--pair needs a pair name".to_string()));
        }

        Ok(Self {
            config_path: cli.config,
            action,
            mode: SyncMode {
                dry_run: cli.dry_run,
                use_checksum: cli.checksum,
                verbose: cli.verbose,
            },
            pair: cli.pair,
            rsync: cli.rsync,
        })
    }
}
