//! Console diagnostics
//!
//! Diagnostics go to stderr through `tracing`; the per-run record lives in
//! [`crate::runlog`]. Control the level with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=debug pairsync --dry-run
//! RUST_LOG=pairsync::executor=trace pairsync
//! ```

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `verbose` lowers the default level to debug.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // try_init: a second call (e.g. from tests) leaves the first subscriber in place
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
