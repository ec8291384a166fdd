//! Human-readable listings and run summaries

use crate::config::Configuration;
use crate::executor::{Executor, SyncMode};
use crate::resolver::{PathResolver, Resolution};
use crate::types::{Outcome, RunResult, SyncPair};
use std::path::{Path, PathBuf};

const RULE: &str = "==================================================";

/// Every configured pair with its enabled and resolved status
pub fn format_listing(config: &Configuration, resolver: &PathResolver<'_>) -> String {
    let mut lines = vec!["Configured Sync Pairs:".to_string(), RULE.to_string()];
    let mut enabled = 0usize;
    let mut unavailable = 0usize;

    for (index, pair) in config.sync_pairs.iter().enumerate() {
        if pair.enabled {
            enabled += 1;
        }
        lines.push(format!(
            "{}. {} [{}] {}",
            index + 1,
            pair.name,
            if pair.enabled { "ENABLED" } else { "DISABLED" },
            pair.direction.as_str()
        ));

        match resolver.resolve(pair) {
            Resolution::Resolved(resolved) => {
                lines.push(format!("   Source: {}", describe(&pair.source, &resolved.source)));
                lines.push(format!(
                    "   Destination: {}",
                    describe(&pair.destination, &resolved.destination)
                ));
                lines.push("   Status: resolved".to_string());
            }
            Resolution::Unavailable(missing) => {
                unavailable += 1;
                lines.push(format!("   Source: {}", pair.source.display()));
                lines.push(format!("   Destination: {}", pair.destination.display()));
                lines.push(format!("   Status: unavailable - {}", missing));
            }
        }
        if !pair.rsync_options.is_empty() {
            lines.push(format!("   Options: {}", pair.rsync_options.join(" ")));
        }
        if let Some(description) = &pair.description {
            lines.push(format!("   Description: {}", description));
        }
        lines.push(String::new());
    }

    if config.sync_pairs.is_empty() {
        lines.push("  (no sync pairs configured)".to_string());
        lines.push(String::new());
    }

    lines.extend(format_untracked(&resolver.untracked_directories(config)));
    lines.push(format!(
        "{} pair(s): {} enabled, {} disabled, {} unavailable",
        config.sync_pairs.len(),
        enabled,
        config.sync_pairs.len() - enabled,
        unavailable
    ));
    lines.join("\n")
}

/// Effective roots, paths, excludes and command lines, without running
pub fn format_resolved(
    config: &Configuration,
    resolver: &PathResolver<'_>,
    executor: &Executor<'_>,
    pairs: &[&SyncPair],
    mode: &SyncMode,
) -> String {
    let mut lines = vec!["Resolved Configuration:".to_string(), RULE.to_string()];

    if !config.roots.is_empty() {
        lines.push("Roots:".to_string());
        for alias in config.roots.keys() {
            let active = resolver
                .resolve_root(alias)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none available)".to_string());
            lines.push(format!("  {} -> {}", alias, active));
        }
    }
    lines.push(format!("File comparison: {}", mode.comparison()));
    lines.push(format!("Dry run: {}", mode.dry_run));
    lines.push(String::new());

    let mut shown = 0usize;
    for pair in pairs {
        if !pair.enabled {
            lines.push(format!("{}: disabled", pair.name));
            continue;
        }
        match resolver.resolve(pair) {
            Resolution::Resolved(resolved) => {
                shown += 1;
                lines.push(format!("{} ({})", pair.name, pair.direction.as_str()));
                lines.push(format!("  Source: {}", resolved.source.display()));
                lines.push(format!(
                    "  Destination: {}{}",
                    resolved.destination.display(),
                    if resolved.destination_exists { "" } else { " (will be created)" }
                ));
                lines.push(format!(
                    "  Excludes: {}",
                    executor.effective_excludes(pair).join(" ")
                ));
                for leg in executor.plan(&resolved, mode) {
                    lines.push(format!(
                        "  {}: {}",
                        leg.kind.label(),
                        leg.command_line(executor.tool().program())
                    ));
                }
            }
            Resolution::Unavailable(missing) => {
                lines.push(format!("{}: {}", pair.name, missing));
            }
        }
        lines.push(String::new());
    }

    lines.extend(format_untracked(&resolver.untracked_directories(config)));
    lines.push(format!(
        "{} of {} pair(s) ready to sync",
        shown,
        pairs.len()
    ));
    lines.join("\n")
}

/// One line per finished pair
pub fn format_result_line(result: &RunResult) -> String {
    let marker = match result.outcome {
        Outcome::Success => "[ok]  ",
        Outcome::Failure => "[FAIL]",
        Outcome::SkippedDisabled => "[skip]",
        Outcome::SkippedMissingSource | Outcome::SkippedMissingDestination => "[warn]",
    };
    let elapsed = result.elapsed().num_milliseconds().max(0) as f64 / 1000.0;
    format!(
        "{} {}: {} - {} ({:.1}s)",
        marker, result.pair_name, result.outcome, result.summary, elapsed
    )
}

/// Counts per outcome for the whole run
pub fn format_summary(results: &[RunResult]) -> String {
    let count = |outcome: Outcome| results.iter().filter(|r| r.outcome == outcome).count();
    format!(
        "Synchronization complete: {} pair(s) considered\n  \
         Succeeded: {}  Failed: {}  Skipped (disabled): {}  \
         Skipped (missing source): {}  Skipped (missing destination): {}",
        results.len(),
        count(Outcome::Success),
        count(Outcome::Failure),
        count(Outcome::SkippedDisabled),
        count(Outcome::SkippedMissingSource),
        count(Outcome::SkippedMissingDestination),
    )
}

fn format_untracked(untracked: &[PathBuf]) -> Vec<String> {
    if untracked.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["WARNING: directories not included in any sync pair:".to_string()];
    lines.extend(untracked.iter().map(|p| format!("  - {}", p.display())));
    lines.push(String::new());
    lines
}

fn describe(configured: &Path, resolved: &Path) -> String {
    if configured == resolved {
        configured.display().to_string()
    } else {
        format!("{} -> {}", configured.display(), resolved.display())
    }
}
