//! Terminal output

mod progress;
mod report;

pub use progress::PairProgress;
pub use report::{format_listing, format_resolved, format_result_line, format_summary};
