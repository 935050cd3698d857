//! webscenario - browser UI scenario runner
//!
//! Scenarios are ordered lists of UI steps executed against a single
//! browser session. Sessions come from a [`session::Driver`]: Chrome over
//! the DevTools protocol, or an in-memory storefront for dry runs and tests.

pub mod cli;
pub mod commands;
pub mod common;
pub mod scenario;
pub mod session;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result, StepError};
pub use scenario::{Scenario, ScenarioId, Step};
pub use testing::{run_suite, RunOptions, RunOutcome, Runner, SuiteReport};
