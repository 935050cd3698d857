//! Run reports
//!
//! Structured results for one scenario and for a whole suite, written as
//! JSON when `--report` is given.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::runner::RunOutcome;
use crate::common::{Error, Result};
use crate::scenario::{Scenario, Step};

/// Why a scenario did not pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Failure {
    /// Stable error code, e.g. `ELEMENT_NOT_FOUND`
    pub code: String,
    pub message: String,
    /// Zero-based index of the failing step, when a step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    /// Page captured when the step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl Failure {
    pub fn from_error(error: &Error) -> Self {
        let (step_index, step, screenshot) = match error {
            Error::StepFailed {
                index,
                step,
                screenshot,
                ..
            } => (Some(*index), Some(step.clone()), screenshot.clone()),
            Error::Cancelled { index } => (Some(*index), None, None),
            _ => (None, None, None),
        };

        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            step_index,
            step,
            screenshot,
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// Scenario title, `<name>_<date>`
    pub scenario: String,
    pub file_stem: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub duration_ms: u64,
    pub screenshots: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl RunReport {
    pub fn from_result(scenario: &Scenario, result: &Result<RunOutcome>, duration_ms: u64) -> Self {
        let steps_total = scenario.steps().len();
        let base = Self {
            scenario: scenario.title(),
            file_stem: scenario.id().file_stem(),
            passed: false,
            steps_run: 0,
            steps_total,
            duration_ms,
            screenshots: Vec::new(),
            failure: None,
        };

        match result {
            Ok(outcome) => Self {
                passed: true,
                steps_run: outcome.steps_run,
                screenshots: outcome.captures.iter().map(|c| c.path.clone()).collect(),
                ..base
            },
            Err(error) => {
                let failure = Failure::from_error(error);
                let steps_run = match error {
                    // the failing step counts as attempted
                    Error::StepFailed { index, .. } => index + 1,
                    Error::Cancelled { index } => *index,
                    _ => 0,
                };
                Self {
                    steps_run,
                    failure: Some(failure),
                    ..base
                }
            }
        }
    }
}

/// Results of every scenario in one invocation, in input order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub driver: String,
    pub results: Vec<RunReport>,
}

impl SuiteReport {
    pub fn new(driver: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            driver: driver.to_string(),
            results: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Percentage of scenarios that passed; 0 for an empty suite
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.passed() as f64 * 100.0 / self.total() as f64
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
