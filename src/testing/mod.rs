//! Scenario execution
//!
//! The runner drives one scenario through one session; the suite runs
//! several scenarios with bounded concurrency and collects reports.

mod report;
mod runner;
mod suite;

pub use report::{Failure, RunReport, SuiteReport};
pub use runner::{Capture, RunOptions, RunOutcome, Runner};
pub use suite::{run_suite, run_suite_with};
