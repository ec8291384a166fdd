//! End-to-end run controller tests.
//!
//! A copying fake stands in for rsync so the orchestration (pair selection,
//! skipping, failure isolation, logging) runs against real directories.

use pairsync::config::{Action, ConfigStore, Configuration, RunOptions};
use pairsync::executor::{SyncMode, TransferOutput, TransferTool};
use pairsync::resolver::{EnvironmentProbe, HostProbe};
use pairsync::{Direction, Outcome, RunController, SyncError, SyncPair};
use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Copies top-level files from the source argument to the destination
/// argument unless `--dry-run` is present. Pairs whose destination path
/// contains `fail_on` exit with code 23.
struct CopyingTool {
    calls: RefCell<Vec<Vec<String>>>,
    fail_on: Option<String>,
    interrupt_on: Option<String>,
}

impl CopyingTool {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on: None,
            interrupt_on: None,
        }
    }

    fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::new()
        }
    }

    fn interrupting_on(marker: &str) -> Self {
        Self {
            interrupt_on: Some(marker.to_string()),
            ..Self::new()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl TransferTool for CopyingTool {
    fn program(&self) -> &Path {
        Path::new("rsync")
    }

    fn invoke(&self, args: &[OsString]) -> Result<TransferOutput, SyncError> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.borrow_mut().push(args.clone());

        let to = PathBuf::from(&args[args.len() - 1]);
        let from = PathBuf::from(args[args.len() - 2].trim_end_matches('/'));

        if let Some(marker) = &self.interrupt_on {
            if to.to_string_lossy().contains(marker.as_str()) {
                return Err(SyncError::Interrupted);
            }
        }
        if let Some(marker) = &self.fail_on {
            if to.to_string_lossy().contains(marker.as_str()) {
                return Ok(TransferOutput {
                    code: Some(23),
                    stdout: String::new(),
                    stderr: "rsync error: some files could not be transferred (code 23)\n"
                        .to_string(),
                });
            }
        }

        let mut copied = 0;
        if !args.iter().any(|a| a == "--dry-run") {
            for entry in fs::read_dir(&from)? {
                let entry = entry?;
                if entry.path().is_file() {
                    fs::copy(entry.path(), to.join(entry.file_name()))?;
                    copied += 1;
                }
            }
        }

        Ok(TransferOutput {
            code: Some(0),
            stdout: format!("Number of regular files transferred: {}\n", copied),
            stderr: String::new(),
        })
    }
}

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: TempDir::new().expect("create fixture tempdir"),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).expect("create fixture dir");
        path
    }

    fn config_path(&self) -> PathBuf {
        self.path("sync_config.json")
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path())
    }

    fn write_config(&self, pairs: Vec<SyncPair>) {
        let config = Configuration {
            sync_pairs: pairs,
            log_directory: self.path("logs"),
            ..Configuration::empty()
        };
        self.store().save(&config).expect("save fixture config");
    }

    fn options(&self, mode: SyncMode, pair: Option<&str>) -> RunOptions {
        RunOptions {
            config_path: self.config_path(),
            action: Action::Run,
            mode,
            pair: pair.map(str::to_string),
            rsync: PathBuf::from("rsync"),
        }
    }

    fn log_text(&self) -> String {
        let entries: Vec<_> = fs::read_dir(self.path("logs"))
            .expect("read log dir")
            .map(|e| e.expect("log entry").path())
            .collect();
        assert_eq!(entries.len(), 1, "expected exactly one run log");
        fs::read_to_string(&entries[0]).expect("read run log")
    }
}

#[test]
fn test_disabled_pair_is_never_executed() {
    let fx = Fixture::new();
    fs::write(fx.dir("a").join("f.txt"), b"a").unwrap();
    fs::write(fx.dir("b").join("f.txt"), b"b").unwrap();
    let mut disabled = SyncPair::new("B", fx.path("b"), fx.path("b-copy"));
    disabled.enabled = false;
    fx.write_config(vec![SyncPair::new("A", fx.path("a"), fx.path("a-copy")), disabled]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let report = controller.run(&fx.options(SyncMode::default(), None)).unwrap();

    assert_eq!(tool.call_count(), 1);
    assert_eq!(report.results[0].outcome, Outcome::Success);
    assert_eq!(report.results[1].outcome, Outcome::SkippedDisabled);
    assert_eq!(report.exit_code(), 0);
    assert!(fx.path("a-copy/f.txt").exists());
    assert!(!fx.path("b-copy").exists());
}

#[test]
fn test_missing_source_is_warning_not_failure() {
    let fx = Fixture::new();
    fx.write_config(vec![SyncPair::new("A", fx.path("gone"), fx.path("a-copy"))]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let report = controller.run(&fx.options(SyncMode::default(), None)).unwrap();

    assert_eq!(tool.call_count(), 0);
    assert_eq!(report.count(Outcome::SkippedMissingSource), 1);
    assert_eq!(report.exit_code(), 0);
    assert!(fx.log_text().contains("WARNING - Pair 'A' finished: skipped-missing-source"));
}

#[test]
fn test_failure_does_not_stop_later_pairs() {
    let fx = Fixture::new();
    fx.dir("a");
    fx.dir("b");
    fx.dir("c");
    fx.write_config(vec![
        SyncPair::new("A", fx.path("a"), fx.path("a-copy")),
        SyncPair::new("B", fx.path("b"), fx.path("bad-copy")),
        SyncPair::new("C", fx.path("c"), fx.path("c-copy")),
    ]);

    let tool = CopyingTool::failing_on("bad-copy");
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let report = controller.run(&fx.options(SyncMode::default(), None)).unwrap();

    assert_eq!(tool.call_count(), 3);
    let outcomes: Vec<Outcome> = report.results.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Success, Outcome::Failure, Outcome::Success]);
    assert_eq!(report.exit_code(), 1);

    let log = fx.log_text();
    assert!(log.contains("Pair 'A' finished: success"));
    assert!(log.contains("ERROR - Pair 'B' finished: failure"));
    assert!(log.contains("some files could not be transferred"));
    assert!(log.contains("Pair 'C' finished: success"));
}

#[test]
fn test_pair_filter_runs_only_that_pair() {
    let fx = Fixture::new();
    fx.dir("a");
    fx.dir("b");
    fx.write_config(vec![
        SyncPair::new("A", fx.path("a"), fx.path("a-copy")),
        SyncPair::new("B", fx.path("b"), fx.path("b-copy")),
    ]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let report = controller.run(&fx.options(SyncMode::default(), Some("B"))).unwrap();

    assert_eq!(tool.call_count(), 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].pair_name, "B");
}

#[test]
fn test_unknown_pair_filter_is_fatal() {
    let fx = Fixture::new();
    fx.write_config(vec![SyncPair::new("A", fx.path("a"), fx.path("a-copy"))]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let err = controller
        .run(&fx.options(SyncMode::default(), Some("nope")))
        .unwrap_err();

    assert!(matches!(err, SyncError::UnknownPair(name) if name == "nope"));
    assert_eq!(tool.call_count(), 0);
}

#[test]
fn test_dry_run_leaves_destination_untouched() {
    let fx = Fixture::new();
    fs::write(fx.dir("a").join("new.txt"), b"fresh").unwrap();
    let existing = fx.dir("a-copy").join("old.txt");
    fs::write(&existing, b"old").unwrap();
    let stamp = filetime::FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&existing, stamp).unwrap();
    fs::write(fx.dir("b").join("x.txt"), b"x").unwrap();

    fx.write_config(vec![
        SyncPair::new("A", fx.path("a"), fx.path("a-copy"))
            .with_direction(Direction::Bidirectional),
        SyncPair::new("B", fx.path("b"), fx.path("b-new")),
    ]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let mode = SyncMode {
        dry_run: true,
        ..SyncMode::default()
    };
    let report = controller.run(&fx.options(mode, None)).unwrap();

    assert_eq!(report.count(Outcome::Success), 2);
    assert!(report.results[0].summary.ends_with("(dry run)"));
    assert!(!fx.path("a-copy/new.txt").exists());
    assert!(!fx.path("a/old.txt").exists());
    let meta = fs::metadata(&existing).unwrap();
    assert_eq!(filetime::FileTime::from_last_modification_time(&meta), stamp);
    assert!(!fx.path("b-new").exists());

    for call in tool.calls.borrow().iter() {
        assert!(call.contains(&"--dry-run".to_string()));
        assert!(!call.iter().any(|a| a.starts_with("--del")));
    }
    assert!(fx.log_text().contains("DRY RUN MODE"));
}

#[test]
fn test_bidirectional_pair_pulls_then_pushes() {
    let fx = Fixture::new();
    fs::write(fx.dir("a").join("from-source.txt"), b"s").unwrap();
    fs::write(fx.dir("a-copy").join("from-dest.txt"), b"d").unwrap();
    fx.write_config(vec![
        SyncPair::new("A", fx.path("a"), fx.path("a-copy")).with_direction(Direction::Bidirectional)
    ]);

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    controller.run(&fx.options(SyncMode::default(), None)).unwrap();

    let calls = tool.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].iter().any(|a| a.starts_with("--delete")));
    assert!(calls[1].contains(&"--delete".to_string()));
    assert!(fx.path("a/from-dest.txt").exists());
    assert!(fx.path("a-copy/from-source.txt").exists());
}

#[test]
fn test_interrupt_stops_the_run() {
    let fx = Fixture::new();
    fx.dir("a");
    fx.dir("b");
    fx.write_config(vec![
        SyncPair::new("A", fx.path("a"), fx.path("stop-here")),
        SyncPair::new("B", fx.path("b"), fx.path("b-copy")),
    ]);

    let tool = CopyingTool::interrupting_on("stop-here");
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let err = controller.run(&fx.options(SyncMode::default(), None)).unwrap_err();

    assert!(matches!(err, SyncError::Interrupted));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(tool.call_count(), 1);
    assert!(fx.log_text().contains("Run interrupted during 'A'"));
}

#[test]
fn test_malformed_config_is_fatal() {
    let fx = Fixture::new();
    fs::write(fx.config_path(), b"{ \"sync_pairs\": [ ").unwrap();

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    let err = controller.run(&fx.options(SyncMode::default(), None)).unwrap_err();

    assert!(err.is_config_error());
    assert!(err.to_string().contains("not valid JSON"));
    assert_eq!(tool.call_count(), 0);
    assert!(!fx.path("logs").exists());
}

#[test]
fn test_enable_disable_round_trip_keeps_other_fields() {
    let fx = Fixture::new();
    let mut pair = SyncPair::new("A", fx.path("a"), fx.path("a-copy"));
    pair.excludes = vec!["*.bak".to_string()];
    pair.description = Some("photos".to_string());
    fx.write_config(vec![pair, SyncPair::new("B", fx.path("b"), fx.path("b-copy"))]);
    let before = fx.store().read().unwrap();

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &HostProbe, &tool);
    controller.set_enabled("A", false).unwrap();

    let after = fx.store().read().unwrap();
    assert!(!after.pair("A").unwrap().enabled);
    assert_eq!(after.pair("A").unwrap().excludes, vec!["*.bak"]);
    assert_eq!(after.pair("B"), before.pair("B"));

    controller.set_enabled("A", true).unwrap();
    assert_eq!(fx.store().read().unwrap(), before);

    assert!(matches!(
        controller.set_enabled("zzz", true),
        Err(SyncError::UnknownPair(_))
    ));
}

/// Host filesystem, but with the home directory and volume listing
/// confined to a temporary directory
struct SandboxProbe {
    home: PathBuf,
}

impl EnvironmentProbe for SandboxProbe {
    fn is_dir(&self, path: &Path) -> bool {
        path.starts_with(&self.home) && path.is_dir()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.home.clone())
    }

    fn user_name(&self) -> Option<String> {
        None
    }

    fn list_dirs(&self, path: &Path) -> Vec<String> {
        if path.starts_with(&self.home) {
            HostProbe.list_dirs(path)
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_first_run_generates_configuration() {
    let fx = Fixture::new();
    let probe = SandboxProbe {
        home: fx.dir("home"),
    };
    assert!(!fx.config_path().exists());

    let tool = CopyingTool::new();
    let controller = RunController::new(fx.store(), &probe, &tool);

    // Listing previews without writing
    let listing = controller.list().unwrap();
    assert!(listing.contains("not yet saved"));
    assert!(!fx.config_path().exists());

    let report = controller.run(&fx.options(SyncMode::default(), None)).unwrap();
    assert_eq!(report.exit_code(), 0);
    assert!(fx.config_path().exists());

    let config = fx.store().read().unwrap();
    assert!(config.global_excludes.contains(&".DS_Store".to_string()));
    assert_eq!(
        config.roots["local"],
        vec![PathBuf::from("/mnt/sync"), fx.path("home/sync")]
    );
    assert!(fx.path("logs").is_dir());
    assert!(report.log_path.unwrap().starts_with(fx.path("logs")));
}
