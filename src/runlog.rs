//! Per-run log file
//!
//! One file per run under the configured log directory, named after the run
//! timestamp. Every entry is flushed as soon as it is written, so the file is
//! complete up to the last entry even if the process is killed;
//! [`RunLog::finish`] additionally syncs it to disk.

use crate::types::{RunResult, SyncError};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Append-only log of one run
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Create `sync_YYYYmmdd_HHMMSS.log`, adding a suffix if the name is taken
    pub fn create(directory: &Path, started_at: DateTime<Local>) -> Result<Self, SyncError> {
        fs::create_dir_all(directory).map_err(|e| log_error(directory, e))?;

        let stem = format!("sync_{}", started_at.format("%Y%m%d_%H%M%S"));
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.log", stem)
            } else {
                format!("{}_{}.log", stem, attempt)
            };
            let path = directory.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(Self {
                        path,
                        writer: BufWriter::new(file),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 100 => attempt += 1,
                Err(e) => return Err(log_error(&path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: &str) -> Result<(), SyncError> {
        self.line("INFO", message)
    }

    pub fn warn(&mut self, message: &str) -> Result<(), SyncError> {
        self.line("WARNING", message)
    }

    pub fn error(&mut self, message: &str) -> Result<(), SyncError> {
        self.line("ERROR", message)
    }

    /// Raw tool output, indented under the preceding line
    pub fn raw(&mut self, text: &str) -> Result<(), SyncError> {
        for line in text.lines() {
            writeln!(self.writer, "    {}", line).map_err(|e| log_error(&self.path, e))?;
        }
        self.flush()
    }

    /// One entry per considered pair
    pub fn record(&mut self, result: &RunResult) -> Result<(), SyncError> {
        let message = format!(
            "Pair '{}' finished: {} ({}) [{} -> {}]",
            result.pair_name,
            result.outcome,
            result.summary,
            result.started_at.format("%H:%M:%S"),
            result.finished_at.format("%H:%M:%S"),
        );
        if result.outcome.is_failure() {
            self.error(&message)?;
            if !result.log_excerpt.is_empty() {
                self.raw(&result.log_excerpt)?;
            }
            Ok(())
        } else if result.outcome.is_warning() {
            self.warn(&message)
        } else {
            self.info(&message)
        }
    }

    /// Flush to disk and hand back the file path
    pub fn finish(mut self) -> Result<PathBuf, SyncError> {
        self.flush()?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| log_error(&self.path, e))?;
        Ok(self.path.clone())
    }

    fn line(&mut self, level: &str, message: &str) -> Result<(), SyncError> {
        writeln!(
            self.writer,
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            message
        )
        .map_err(|e| log_error(&self.path, e))?;
        self.flush()
    }

    fn flush(&mut self) -> Result<(), SyncError> {
        self.writer.flush().map_err(|e| log_error(&self.path, e))
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

fn log_error(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::LogUnavailable {
        path: path.to_path_buf(),
        source,
    }
}
