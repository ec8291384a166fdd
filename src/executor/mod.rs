//! Executor module - builds and runs the transfer for one resolved pair

pub mod transfer;

pub use transfer::{RsyncTool, TransferOutput, TransferTool};

use crate::config::Configuration;
use crate::resolver::{EnvironmentProbe, ResolvedPair};
use crate::runlog::RunLog;
use crate::types::{
    is_delete_flag, Direction, Outcome, RunResult, SyncError, SyncPair, TransferStats,
};
use crate::ui::PairProgress;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Makes the sending side delete what it sent; never allowed where the
/// destination is the sender
const REMOVE_SOURCE_FILES: &str = "--remove-source-files";

/// How many trailing lines of tool error output are kept in a RunResult
const EXCERPT_LINES: usize = 5;

/// Per-run execution switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncMode {
    /// Preview only; nothing under the destination changes
    pub dry_run: bool,
    /// Content comparison instead of size + modification time
    pub use_checksum: bool,
    /// Surface the tool's own output
    pub verbose: bool,
}

impl SyncMode {
    pub fn comparison(&self) -> &'static str {
        if self.use_checksum {
            "checksum"
        } else {
            "timestamp"
        }
    }
}

/// Which way a single transfer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegKind {
    /// destination -> source, never deleting
    Pull,
    /// source -> destination
    Push,
}

impl LegKind {
    pub fn label(&self) -> &'static str {
        match self {
            LegKind::Pull => "pull",
            LegKind::Push => "push",
        }
    }
}

/// One tool invocation with its full argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLeg {
    pub kind: LegKind,
    pub from: PathBuf,
    pub to: PathBuf,
    pub args: Vec<OsString>,
}

impl TransferLeg {
    /// Shell-like rendering for logs and listings
    pub fn command_line(&self, program: &Path) -> String {
        std::iter::once(program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|arg| quote(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:,+@%".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Runs transfers for resolved pairs against one configuration
pub struct Executor<'a> {
    config: &'a Configuration,
    tool: &'a dyn TransferTool,
    probe: &'a dyn EnvironmentProbe,
}

impl<'a> Executor<'a> {
    pub fn new(
        config: &'a Configuration,
        tool: &'a dyn TransferTool,
        probe: &'a dyn EnvironmentProbe,
    ) -> Self {
        Self {
            config,
            tool,
            probe,
        }
    }

    pub fn tool(&self) -> &dyn TransferTool {
        self.tool
    }

    /// `global_excludes` followed by the pair's own, first occurrence kept
    pub fn effective_excludes(&self, pair: &SyncPair) -> Vec<String> {
        dedup(self.config.global_excludes.iter().chain(pair.excludes.iter()))
    }

    /// Flags for one leg, without excludes or paths
    pub fn effective_flags(
        &self,
        pair: &SyncPair,
        kind: LegKind,
        mode: &SyncMode,
    ) -> Vec<String> {
        let deletes = kind == LegKind::Push && pair.deletes_destination() && !mode.dry_run;

        let mut flags = vec!["--archive".to_string()];
        for option in merge_options(&self.config.global_rsync_options, &pair.rsync_options) {
            if is_delete_flag(&option) && !deletes {
                continue;
            }
            // The pull leg sends from the destination
            if kind == LegKind::Pull && option == REMOVE_SOURCE_FILES {
                continue;
            }
            push_unique(&mut flags, &option);
        }

        if mode.use_checksum {
            push_unique(&mut flags, "--checksum");
        }
        if deletes && !flags.iter().any(|f| is_delete_flag(f)) {
            flags.push("--delete".to_string());
        }
        if mode.dry_run {
            push_unique(&mut flags, "--dry-run");
        }
        if mode.verbose {
            push_unique(&mut flags, "--verbose");
        }
        push_unique(&mut flags, "--stats");
        flags
    }

    /// Transfers needed for a pair, in execution order.
    ///
    /// Bidirectional pairs pull first so that nothing only present on the
    /// destination is deleted by the push.
    pub fn plan(&self, resolved: &ResolvedPair, mode: &SyncMode) -> Vec<TransferLeg> {
        let pair = &resolved.pair;
        let mut legs = Vec::with_capacity(2);

        // A destination that is not created in a dry run has nothing to pull
        let pull = pair.direction == Direction::Bidirectional
            && (resolved.destination_exists || !mode.dry_run);
        if pull {
            legs.push(self.leg(
                pair,
                LegKind::Pull,
                &resolved.destination,
                &resolved.source,
                mode,
            ));
        }
        legs.push(self.leg(
            pair,
            LegKind::Push,
            &resolved.source,
            &resolved.destination,
            mode,
        ));
        legs
    }

    fn leg(
        &self,
        pair: &SyncPair,
        kind: LegKind,
        from: &Path,
        to: &Path,
        mode: &SyncMode,
    ) -> TransferLeg {
        let mut args: Vec<OsString> = self
            .effective_flags(pair, kind, mode)
            .into_iter()
            .map(OsString::from)
            .collect();
        args.extend(
            self.effective_excludes(pair)
                .into_iter()
                .map(|pattern| OsString::from(format!("--exclude={}", pattern))),
        );

        // Trailing slash: copy the directory's contents, not the directory
        let mut from_arg = from.as_os_str().to_owned();
        if !from_arg.to_string_lossy().ends_with('/') {
            from_arg.push("/");
        }
        args.push(from_arg);
        args.push(to.as_os_str().to_owned());

        TransferLeg {
            kind,
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            args,
        }
    }

    /// Run every leg of a resolved pair.
    ///
    /// Transfer problems become a `failure` outcome. Only an operator
    /// interrupt or a log write error is returned as `Err`.
    pub fn execute(
        &self,
        resolved: &ResolvedPair,
        mode: &SyncMode,
        log: &mut RunLog,
    ) -> Result<RunResult, SyncError> {
        let started_at = Local::now();
        let name = resolved.pair.name.as_str();

        log.info(&format!(
            "Starting sync for '{}' ({}): {} -> {}",
            name,
            resolved.pair.direction.as_str(),
            resolved.source.display(),
            resolved.destination.display()
        ))?;

        if resolved.source == resolved.destination {
            let error = SyncError::TransferFailure(format!(
                "source and destination both resolve to {}",
                resolved.source.display()
            ));
            return Ok(failed(name, started_at, &error, String::new()));
        }

        // Mounts can disappear between resolution and execution
        if !self.probe.is_dir(&resolved.source) {
            let missing = SyncError::PathUnavailable {
                path: resolved.source.clone(),
            };
            log.warn(&format!("Source for '{}' vanished: {}", name, missing))?;
            return Ok(RunResult {
                started_at,
                ..RunResult::skipped(name, Outcome::SkippedMissingSource, missing.to_string())
            });
        }

        if !mode.dry_run && !resolved.destination_exists {
            match fs::create_dir(&resolved.destination) {
                Ok(()) => log.info(&format!(
                    "Created destination directory: {}",
                    resolved.destination.display()
                ))?,
                // Created concurrently; anything else in the way is a failure
                Err(e)
                    if e.kind() == ErrorKind::AlreadyExists
                        && self.probe.is_dir(&resolved.destination) => {}
                Err(e) => {
                    let error = match e.kind() {
                        ErrorKind::AlreadyExists => SyncError::TransferFailure(format!(
                            "destination {} exists and is not a directory",
                            resolved.destination.display()
                        )),
                        _ => match SyncError::from(e) {
                            err if err.is_permission_error() => SyncError::PermissionDenied {
                                path: resolved.destination.clone(),
                            },
                            err => err,
                        },
                    };
                    return Ok(failed(name, started_at, &error, String::new()));
                }
            }
        }

        let progress = PairProgress::start(name);
        let mut stats = TransferStats::default();

        for leg in self.plan(resolved, mode) {
            progress.set_leg(name, leg.kind);
            log.info(&format!(
                "Running command: {}",
                leg.command_line(self.tool.program())
            ))?;

            let output = match self.tool.invoke(&leg.args) {
                Ok(output) => output,
                Err(SyncError::Interrupted) => {
                    progress.abandon(name);
                    log.warn(&format!("Transfer for '{}' interrupted", name))?;
                    return Err(SyncError::Interrupted);
                }
                Err(error) => {
                    progress.abandon(name);
                    return Ok(failed(name, started_at, &error, String::new()));
                }
            };

            if output.was_interrupted() {
                progress.abandon(name);
                log.warn(&format!("Transfer for '{}' interrupted", name))?;
                return Err(SyncError::Interrupted);
            }

            if mode.verbose {
                log.raw(&output.stdout)?;
                progress.print_output(&output.stdout);
            }

            if !output.success() {
                progress.abandon(name);
                let error = classify_failure(&output, &leg);
                return Ok(failed(name, started_at, &error, excerpt(&output.stderr)));
            }

            stats = stats.merge(TransferStats::parse(&output.stdout));
        }

        progress.finish();
        let mut summary = stats.describe();
        if mode.dry_run {
            summary.push_str(" (dry run)");
        }

        Ok(RunResult {
            pair_name: name.to_string(),
            started_at,
            finished_at: Local::now(),
            outcome: Outcome::Success,
            summary,
            stats,
            log_excerpt: String::new(),
        })
    }
}

fn failed(
    name: &str,
    started_at: DateTime<Local>,
    error: &SyncError,
    log_excerpt: String,
) -> RunResult {
    RunResult {
        pair_name: name.to_string(),
        started_at,
        finished_at: Local::now(),
        outcome: Outcome::Failure,
        summary: error.to_string(),
        stats: TransferStats::default(),
        log_excerpt,
    }
}

fn classify_failure(output: &TransferOutput, leg: &TransferLeg) -> SyncError {
    if output.stderr.contains("Permission denied") {
        let path = match leg.kind {
            LegKind::Push => leg.to.clone(),
            LegKind::Pull => leg.from.clone(),
        };
        return SyncError::PermissionDenied { path };
    }
    let code = output
        .code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string());
    SyncError::TransferFailure(format!(
        "{} leg exited with code {}",
        leg.kind.label(),
        code
    ))
}

fn excerpt(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(EXCERPT_LINES);
    lines[start..].join("\n")
}

/// Global options then pair options; a pair option replaces any global one
/// with the same key
fn merge_options(global: &[String], pair: &[String]) -> Vec<String> {
    let pair_keys: HashSet<String> = pair.iter().map(|o| option_key(o)).collect();
    dedup(
        global
            .iter()
            .filter(|o| !pair_keys.contains(&option_key(o)))
            .chain(pair.iter()),
    )
}

/// `--perms`, `--no-perms` and `--perms=x` share the key `perms`
fn option_key(option: &str) -> String {
    match option.strip_prefix("--") {
        Some(long) => {
            let name = long.split('=').next().unwrap_or(long);
            name.strip_prefix("no-").unwrap_or(name).to_string()
        }
        None => option.to_string(),
    }
}

fn dedup<'s>(items: impl Iterator<Item = &'s String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

fn push_unique(flags: &mut Vec<String>, flag: &str) {
    if !flags.iter().any(|f| f == flag) {
        flags.push(flag.to_string());
    }
}
