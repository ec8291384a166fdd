//! Progress reporting

use crate::executor::LegKind;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a pair's transfer is running
pub struct PairProgress {
    bar: ProgressBar,
}

impl PairProgress {
    /// Start a spinner for one pair
    pub fn start(pair_name: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_message(format!("Syncing {}...", pair_name));
        Self { bar }
    }

    /// Show which leg is in flight
    pub fn set_leg(&self, pair_name: &str, leg: LegKind) {
        self.bar
            .set_message(format!("Syncing {} ({})...", pair_name, leg.label()));
    }

    /// Print raw tool output above the spinner.
    ///
    /// Printing through `suspend` keeps the output even when the spinner is
    /// hidden because stderr is not a terminal.
    pub fn print_output(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.bar.suspend(|| {
            for line in text.lines() {
                println!("    {}", line);
            }
        });
    }

    /// Stop without a success message
    pub fn abandon(&self, pair_name: &str) {
        self.bar
            .abandon_with_message(format!("Sync of {} stopped", pair_name));
    }

    /// Clear the spinner; the controller prints the result line
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn message(&self) -> String {
        self.bar.message()
    }
}
