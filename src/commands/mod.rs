pub mod run;

pub use run::{RunController, RunReport};
