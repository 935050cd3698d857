//! Scenarios as data
//!
//! A scenario is an immutable, ordered list of UI steps. Scenarios come from
//! the built-in storefront catalog or from YAML files.

pub mod builtin;
pub mod loader;
mod types;

pub use types::{Scenario, ScenarioId, Step};
