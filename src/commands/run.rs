//! Run controller - the orchestration entry point

use crate::config::{Action, ConfigStore, Configuration, RunOptions};
use crate::executor::{Executor, TransferTool};
use crate::resolver::{EnvironmentProbe, PathResolver, PathRole, Resolution};
use crate::runlog::RunLog;
use crate::types::{Outcome, RunResult, SyncError, SyncPair};
use crate::ui::{format_listing, format_resolved, format_result_line, format_summary};
use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Everything a finished run produced
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<RunResult>,
    /// Run log file; `None` for modes that do not transfer
    pub log_path: Option<PathBuf>,
}

impl RunReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// 0 unless some considered pair failed
    pub fn exit_code(&self) -> u8 {
        if self.results.iter().any(|r| r.outcome.is_failure()) {
            1
        } else {
            0
        }
    }
}

/// Wires the configuration store, resolver and executor together
pub struct RunController<'a> {
    store: ConfigStore,
    probe: &'a dyn EnvironmentProbe,
    tool: &'a dyn TransferTool,
}

impl<'a> RunController<'a> {
    pub fn new(
        store: ConfigStore,
        probe: &'a dyn EnvironmentProbe,
        tool: &'a dyn TransferTool,
    ) -> Self {
        Self { store, probe, tool }
    }

    /// Dispatch on the requested action and print its output
    pub fn execute(&self, options: &RunOptions) -> Result<RunReport, SyncError> {
        match &options.action {
            Action::List => {
                println!("{}", self.list()?);
                Ok(RunReport::default())
            }
            Action::Show => {
                println!("{}", self.show(options)?);
                Ok(RunReport::default())
            }
            Action::SetEnabled { name, enabled } => {
                self.set_enabled(name, *enabled)?;
                println!(
                    "Pair '{}' {} in {}",
                    name,
                    if *enabled { "enabled" } else { "disabled" },
                    self.store.path().display()
                );
                Ok(RunReport::default())
            }
            Action::Run => {
                let report = self.run(options)?;
                println!("{}", format_summary(&report.results));
                if let Some(path) = &report.log_path {
                    println!("Log file: {}", path.display());
                }
                Ok(report)
            }
        }
    }

    /// Listing of every pair; never writes anything
    pub fn list(&self) -> Result<String, SyncError> {
        let config = self.store.preview(self.probe)?;
        let resolver = PathResolver::new(&config, self.probe);
        let mut text = format_listing(&config, &resolver);
        if !self.store.exists() {
            text.push_str(&format!(
                "\n(default configuration, not yet saved to {})",
                self.store.path().display()
            ));
        }
        Ok(text)
    }

    /// Resolved paths and command lines; never writes anything
    pub fn show(&self, options: &RunOptions) -> Result<String, SyncError> {
        let config = self.store.preview(self.probe)?;
        let pairs = select_pairs(&config, options.pair.as_deref())?;
        let resolver = PathResolver::new(&config, self.probe);
        let executor = Executor::new(&config, self.tool, self.probe);
        Ok(format_resolved(&config, &resolver, &executor, &pairs, &options.mode))
    }

    /// Persist a changed enabled flag, leaving everything else untouched
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), SyncError> {
        let config = self.store.read()?;
        let updated = config.with_enabled(name, enabled)?;
        self.store.save(&updated)?;
        info!("Pair '{}' enabled={}", name, enabled);
        Ok(())
    }

    /// Load, resolve and execute pairs in configured order.
    ///
    /// Configuration, log-directory and interrupt errors abort the run;
    /// everything else becomes a per-pair outcome.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport, SyncError> {
        let config = self.store.load(self.probe)?;
        let pairs = select_pairs(&config, options.pair.as_deref())?;
        let mode = &options.mode;

        let mut log = RunLog::create(&self.store.log_directory(&config), Local::now())?;
        info!("Logging to {}", log.path().display());
        log.info(&format!(
            "Starting synchronization process: {} pair(s) from {}",
            pairs.len(),
            self.store.path().display()
        ))?;
        if mode.dry_run {
            log.info("DRY RUN MODE - No actual changes will be made")?;
            info!("Dry run: no changes will be made");
        }
        log.info(&format!("Sync mode: {} comparison", mode.comparison()))?;

        let resolver = PathResolver::new(&config, self.probe);
        for dir in resolver.untracked_directories(&config) {
            warn!("Directory not included in any sync pair: {}", dir.display());
            log.warn(&format!(
                "Directory not included in any sync pair: {}",
                dir.display()
            ))?;
        }

        let executor = Executor::new(&config, self.tool, self.probe);
        let mut results = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let result = if !pair.enabled {
                debug!("Skipping disabled sync pair '{}'", pair.name);
                RunResult::skipped(&pair.name, Outcome::SkippedDisabled, "disabled")
            } else {
                match resolver.resolve(pair) {
                    Resolution::Unavailable(missing) => {
                        let outcome = match missing.role {
                            PathRole::Source => Outcome::SkippedMissingSource,
                            PathRole::Destination => Outcome::SkippedMissingDestination,
                        };
                        warn!("Skipping '{}': {}", pair.name, missing);
                        RunResult::skipped(&pair.name, outcome, missing.to_string())
                    }
                    Resolution::Resolved(resolved) => {
                        match executor.execute(&resolved, mode, &mut log) {
                            Ok(result) => result,
                            Err(SyncError::Interrupted) => {
                                log.error(&format!(
                                    "Run interrupted during '{}'; remaining pairs not processed",
                                    pair.name
                                ))?;
                                log.finish()?;
                                return Err(SyncError::Interrupted);
                            }
                            Err(e) if e.is_fatal() => return Err(e),
                            Err(e) => {
                                RunResult::skipped(&pair.name, Outcome::Failure, e.to_string())
                            }
                        }
                    }
                }
            };

            log.record(&result)?;
            println!("{}", format_result_line(&result));
            if result.outcome.is_failure() {
                eprintln!("error: sync pair '{}' failed: {}", result.pair_name, result.summary);
            }
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.outcome.is_failure()).count();
        log.info(&format!(
            "Synchronization complete: {}/{} pairs without failure",
            results.len() - failed,
            results.len()
        ))?;
        let log_path = log.finish()?;

        Ok(RunReport {
            results,
            log_path: Some(log_path),
        })
    }
}

/// All pairs in configured order, or just the named one
fn select_pairs<'c>(
    config: &'c Configuration,
    name: Option<&str>,
) -> Result<Vec<&'c SyncPair>, SyncError> {
    match name {
        Some(name) => config
            .pair(name)
            .map(|pair| vec![pair])
            .ok_or_else(|| SyncError::UnknownPair(name.to_string())),
        None => Ok(config.sync_pairs.iter().collect()),
    }
}
