//! Subprocess boundary to the external transfer tool

use crate::types::SyncError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};

/// rsync exit code for "received SIGINT or SIGUSR1"
const RSYNC_INTERRUPTED: i32 = 20;

/// Captured result of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TransferOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The tool stopped because the operator interrupted it
    pub fn was_interrupted(&self) -> bool {
        matches!(self.code, None | Some(RSYNC_INTERRUPTED))
    }
}

impl From<std::process::Output> for TransferOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Something that moves files given an argument vector
///
/// The executor only decides which arguments to pass; implementations do
/// the actual work. Tests substitute a fake.
pub trait TransferTool {
    /// Program name used when logging command lines
    fn program(&self) -> &Path;

    /// Run to completion and capture output.
    ///
    /// Returns [`SyncError::Interrupted`] if the operator interrupts while
    /// the transfer is in flight.
    fn invoke(&self, args: &[OsString]) -> Result<TransferOutput, SyncError>;
}

/// Runs the real rsync binary as a child process
pub struct RsyncTool {
    program: PathBuf,
    runtime: Runtime,
}

impl RsyncTool {
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SyncError::Io)?;
        Ok(Self {
            program: program.into(),
            runtime,
        })
    }
}

impl TransferTool for RsyncTool {
    fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(&self, args: &[OsString]) -> Result<TransferOutput, SyncError> {
        self.runtime.block_on(async {
            // Dropping the wait future on interrupt kills the child
            let child = Command::new(&self.program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| spawn_error(&self.program, e))?;

            tokio::select! {
                output = child.wait_with_output() => {
                    Ok::<_, SyncError>(TransferOutput::from(output?))
                }
                _ = operator_interrupt() => Err(SyncError::Interrupted),
            }
        })
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn operator_interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn spawn_error(program: &Path, error: std::io::Error) -> SyncError {
    match error.kind() {
        ErrorKind::NotFound => SyncError::TransferFailure(format!(
            "{} not found; please install rsync",
            program.display()
        )),
        ErrorKind::PermissionDenied => SyncError::PermissionDenied {
            path: program.to_path_buf(),
        },
        _ => SyncError::TransferFailure(format!(
            "cannot start {}: {}",
            program.display(),
            error
        )),
    }
}
