use anyhow::Context;
use clap::Parser;
use pairsync::config::Cli;
use pairsync::executor::RsyncTool;
use pairsync::logging::init_tracing;
use pairsync::resolver::HostProbe;
use pairsync::{ConfigStore, RunController, RunOptions, SyncError};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<SyncError>()
                .map(SyncError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    // Convert CLI args to options - this validates immediately
    let options = RunOptions::try_from(cli)?;

    let tool = RsyncTool::new(&options.rsync).context("failed to start transfer runtime")?;
    let store = ConfigStore::new(&options.config_path);
    let controller = RunController::new(store, &HostProbe, &tool);

    let report = controller.execute(&options)?;
    Ok(report.exit_code())
}
