//! RunResult - Per-pair result of one invocation

use chrono::{DateTime, Local};
use indicatif::HumanBytes;
use std::fmt;

/// Final state of one pair in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    Failure,
    SkippedDisabled,
    SkippedMissingSource,
    SkippedMissingDestination,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::SkippedDisabled => "skipped-disabled",
            Outcome::SkippedMissingSource => "skipped-missing-source",
            Outcome::SkippedMissingDestination => "skipped-missing-destination",
        }
    }

    /// Whether this outcome fails the run
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure)
    }

    /// Skips the operator should hear about
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Outcome::SkippedMissingSource | Outcome::SkippedMissingDestination
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Statistics reported by rsync `--stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files_transferred: Option<u64>,
    pub bytes_transferred: Option<u64>,
}

impl TransferStats {
    /// Parse the statistics block rsync prints with `--stats`.
    ///
    /// Numbers may carry thousands separators (rsync >= 3.1).
    pub fn parse(output: &str) -> Self {
        let mut stats = TransferStats::default();
        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key == "Number of regular files transferred" {
                stats.files_transferred = leading_number(value);
            } else if key == "Total transferred file size" {
                stats.bytes_transferred = leading_number(value);
            }
        }
        stats
    }

    /// Sum two legs of a bidirectional pair
    pub fn merge(self, other: TransferStats) -> TransferStats {
        fn add(a: Option<u64>, b: Option<u64>) -> Option<u64> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.saturating_add(b)),
                (a, None) => a,
                (None, b) => b,
            }
        }
        TransferStats {
            files_transferred: add(self.files_transferred, other.files_transferred),
            bytes_transferred: add(self.bytes_transferred, other.bytes_transferred),
        }
    }

    pub fn describe(&self) -> String {
        match (self.files_transferred, self.bytes_transferred) {
            (Some(files), Some(bytes)) => {
                format!("{} file(s), {} transferred", files, HumanBytes(bytes))
            }
            (Some(files), None) => format!("{} file(s) transferred", files),
            (None, Some(bytes)) => format!("{} transferred", HumanBytes(bytes)),
            (None, None) => "no statistics reported".to_string(),
        }
    }
}

fn leading_number(value: &str) -> Option<u64> {
    let token = value.split_whitespace().next()?;
    token.replace([',', '.'], "").parse().ok()
}

/// Result of considering one pair during a run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub pair_name: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcome: Outcome,
    pub summary: String,
    pub stats: TransferStats,
    pub log_excerpt: String,
}

impl RunResult {
    /// Result for a pair that never reached the executor
    pub fn skipped(pair_name: &str, outcome: Outcome, summary: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            pair_name: pair_name.to_string(),
            started_at: now,
            finished_at: now,
            outcome,
            summary: summary.into(),
            stats: TransferStats::default(),
            log_excerpt: String::new(),
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
