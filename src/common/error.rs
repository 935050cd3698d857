//! Error types for the scenario runner
//!
//! Step failures carry enough context (selector, match count, available
//! options) to fix a scenario without re-running it under a debugger.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::scenario::Step;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for a single step executed against a session
pub type StepResult<T> = std::result::Result<T, StepError>;

/// Failure of a single step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Navigation to '{url}' failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Selector '{selector}' matched {matches} elements, expected exactly one")]
    ElementNotFound { selector: String, matches: usize },

    #[error("Element '{selector}' is not interactable: {reason}")]
    NotInteractable { selector: String, reason: String },

    #[error("Option '{value}' not available in '{selector}'. Available: {}", .available.join(", "))]
    InvalidOption {
        selector: String,
        value: String,
        available: Vec<String>,
    },

    #[error("Failed to capture screenshot to '{path}': {reason}")]
    Capture { path: String, reason: String },

    #[error("{action} timed out after {after:?}")]
    Timeout { action: String, after: Duration },
}

impl StepError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(selector: &str, matches: usize) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            matches,
        }
    }

    pub fn not_interactable(selector: &str, reason: impl ToString) -> Self {
        Self::NotInteractable {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn capture(path: &str, reason: impl ToString) -> Self {
        Self::Capture {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            Self::Navigation { .. } => "NAVIGATION",
            Self::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            Self::NotInteractable { .. } => "NOT_INTERACTABLE",
            Self::InvalidOption { .. } => "INVALID_OPTION",
            Self::Capture { .. } => "CAPTURE",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }
}

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Execution Errors ===
    #[error("Step {} ({step}) failed: {source}", .index + 1)]
    StepFailed {
        /// Zero-based index of the failing step
        index: usize,
        step: Step,
        source: StepError,
        /// Page captured when the step failed
        screenshot: Option<PathBuf>,
    },

    #[error("Scenario cancelled before step {}", .index + 1)]
    Cancelled { index: usize },

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Browser/Session Errors ===
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("Browser launch timed out after {0} seconds")]
    LaunchTimeout(u64),

    #[error("Browser session error: {0}")]
    Session(String),

    // === Scenario Errors ===
    #[error("Scenario '{0}' not found. Use 'webscenario list' to see built-in scenarios")]
    ScenarioNotFound(String),

    #[error("Failed to parse scenario '{path}': {reason}")]
    ScenarioParse { path: String, reason: String },

    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap a step failure with its position in the scenario
    pub fn step_failed(index: usize, step: &Step, source: StepError) -> Self {
        Self::StepFailed {
            index,
            step: step.clone(),
            source,
            screenshot: None,
        }
    }

    /// Create an invalid scenario error
    pub fn invalid_scenario(name: &str, reason: impl ToString) -> Self {
        Self::InvalidScenario {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::StepFailed { source, .. } => source.code(),
            Error::Cancelled { .. } => "CANCELLED",
            Error::ScenariosFailed { .. } => "FAILED",
            Error::BrowserLaunch(_) | Error::LaunchTimeout(_) | Error::Session(_) => "SESSION",
            Error::ScenarioNotFound(_) => "SCENARIO_NOT_FOUND",
            Error::ScenarioParse { .. } | Error::InvalidScenario { .. } => "INVALID_SCENARIO",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG",
            _ => "INTERNAL_ERROR",
        }
    }
}
