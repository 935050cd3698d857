//! Browser sessions
//!
//! A [`Driver`] opens one [`Session`] per scenario run. Sessions expose only
//! the capabilities scenarios need: navigation, fill, click, option
//! selection and page capture. Timeouts, artifact persistence and teardown
//! ordering belong to the runner.

mod chrome;
mod simulated;

use std::path::Path;

use async_trait::async_trait;

use crate::common::{Result, StepResult};

pub use chrome::ChromeDriver;
pub use simulated::{SessionProbe, SimulatedDriver};

/// One browser page, owned by a single scenario run
#[async_trait]
pub trait Session: Send {
    /// Load `url` and wait until the page is actionable
    async fn navigate(&mut self, url: &str) -> StepResult<()>;

    /// Replace the content of the single element matching `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> StepResult<()>;

    /// Click the single element matching `selector`
    async fn click(&mut self, selector: &str) -> StepResult<()>;

    /// Choose `value` (option value or label) in a select element
    async fn select_option(&mut self, selector: &str, value: &str) -> StepResult<Selection>;

    /// Render the current page; `path` is only used for error context
    async fn capture(&mut self, path: &Path) -> StepResult<Vec<u8>>;

    /// Tear the session down. Called exactly once by the runner.
    async fn close(&mut self) -> Result<()>;
}

/// What a select-option action resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Value of the option that matched the request
    pub matched: String,
    /// The select's value after the change
    pub value: String,
}

impl Selection {
    pub fn is_applied(&self) -> bool {
        self.matched == self.value
    }
}

/// Factory for sessions
#[async_trait]
pub trait Driver: Send + Sync {
    /// Short name shown in logs and reports
    fn name(&self) -> &'static str;

    /// Open a fresh session with a blank page
    async fn open(&self) -> Result<Box<dyn Session>>;
}
