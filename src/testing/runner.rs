//! Scenario runner
//!
//! Executes one scenario against one fresh session. Steps run strictly in
//! order; the first failure aborts the run. The session is closed on every
//! path, including timeouts and cancellation, before the result is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::common::config::Config;
use crate::common::{paths, Error, Result, StepError, StepResult};
use crate::scenario::{Scenario, Step};
use crate::session::{Driver, Session};

/// Subdirectory of the artifacts directory for failure captures
const FAILURES_DIR: &str = "failures";

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Bound on navigate steps
    pub navigation_timeout: Duration,
    /// Bound on every other step
    pub step_timeout: Duration,
    /// Bound on closing the session
    pub teardown_timeout: Duration,
    /// Base directory for relative screenshot paths
    pub artifacts_dir: PathBuf,
    /// Capture the page when a step fails
    pub failure_screenshots: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            navigation_timeout: config.timeouts.navigation(),
            step_timeout: config.timeouts.step(),
            teardown_timeout: config.timeouts.teardown(),
            artifacts_dir: config.artifacts.dir.clone(),
            failure_screenshots: config.artifacts.failure_screenshots,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A screenshot written by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Zero-based index of the screenshot step
    pub step_index: usize,
    /// Where the image was written
    pub path: PathBuf,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub steps_run: usize,
    pub captures: Vec<Capture>,
}

/// Executes scenarios against sessions opened from a driver
pub struct Runner {
    driver: Arc<dyn Driver>,
    options: RunOptions,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(driver: Arc<dyn Driver>, options: RunOptions) -> Self {
        Self {
            driver,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts in-flight runs when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Run a scenario on a fresh session
    ///
    /// A step failure comes back as [`Error::StepFailed`] with the step's
    /// index and data; cancellation as [`Error::Cancelled`]. Either way the
    /// session has already been closed.
    pub async fn run(&self, scenario: &Scenario) -> Result<RunOutcome> {
        scenario.validate()?;

        let title = scenario.title();
        if self.cancel.is_cancelled() {
            tracing::debug!(scenario = %title, "Cancelled before start");
            return Err(Error::Cancelled { index: 0 });
        }

        let started = Instant::now();
        tracing::info!(scenario = %title, driver = self.driver.name(), "Starting scenario");

        // Dropping an unfinished open leaves no session to close
        let mut session = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled { index: 0 }),
            session = self.driver.open() => session?,
        };

        let result = match self.execute(session.as_mut(), scenario).await {
            Err(Error::StepFailed {
                index,
                step,
                source,
                ..
            }) => {
                let screenshot = if self.options.failure_screenshots {
                    self.capture_failure(session.as_mut(), scenario, index).await
                } else {
                    None
                };
                Err(Error::StepFailed {
                    index,
                    step,
                    source,
                    screenshot,
                })
            }
            other => other,
        };
        let teardown = self.teardown(session.as_mut()).await;

        match (result, teardown) {
            (Ok(captures), Ok(())) => {
                tracing::info!(scenario = %title, duration = ?started.elapsed(), "Scenario passed");
                Ok(RunOutcome {
                    steps_run: scenario.steps().len(),
                    captures,
                })
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), teardown) => {
                if let Err(close_err) = teardown {
                    tracing::warn!(scenario = %title, "Session teardown failed: {}", close_err);
                }
                tracing::info!(scenario = %title, "Scenario failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(&self, session: &mut dyn Session, scenario: &Scenario) -> Result<Vec<Capture>> {
        let title = scenario.title();
        let mut captures = Vec::new();

        for (index, step) in scenario.steps().iter().enumerate() {
            tracing::info!(scenario = %title, step = index + 1, action = step.action(), "{}", step);

            let bound = self.bound_for(step);
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled { index }),
                outcome = tokio::time::timeout(bound, self.execute_step(session, index, step)) => outcome,
            };

            match outcome {
                Ok(Ok(Some(capture))) => captures.push(capture),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => return Err(Error::step_failed(index, step, e)),
                Err(_) => {
                    let timeout = StepError::Timeout {
                        action: step.action().to_string(),
                        after: bound,
                    };
                    return Err(Error::step_failed(index, step, timeout));
                }
            }
        }

        Ok(captures)
    }

    fn bound_for(&self, step: &Step) -> Duration {
        match step {
            Step::Navigate { .. } => self.options.navigation_timeout,
            _ => self.options.step_timeout,
        }
    }

    async fn execute_step(
        &self,
        session: &mut dyn Session,
        index: usize,
        step: &Step,
    ) -> StepResult<Option<Capture>> {
        match step {
            Step::Navigate { url } => session.navigate(url).await?,
            Step::Fill { selector, value } => session.fill(selector, value).await?,
            Step::Click { selector } => session.click(selector).await?,
            Step::SelectOption { selector, value } => {
                let selection = session.select_option(selector, value).await?;
                if !selection.is_applied() {
                    return Err(StepError::not_interactable(
                        selector,
                        format!(
                            "value is '{}' after choosing '{}' ({:?})",
                            selection.value, selection.matched, value
                        ),
                    ));
                }
                tracing::debug!(step = index + 1, "{} now has value {:?}", selector, selection.value);
            }
            Step::Screenshot { path } => {
                let bytes = session.capture(path).await?;
                let target = paths::artifact_path(&self.options.artifacts_dir, path);
                persist(&target, &bytes).await?;
                tracing::debug!(step = index + 1, "Wrote {} bytes to {}", bytes.len(), target.display());

                return Ok(Some(Capture {
                    step_index: index,
                    path: target,
                }));
            }
        }
        Ok(None)
    }

    /// Best-effort capture of the page a step failed on
    async fn capture_failure(
        &self,
        session: &mut dyn Session,
        scenario: &Scenario,
        index: usize,
    ) -> Option<PathBuf> {
        let name = format!("{}_step{}.png", scenario.id().file_stem(), index + 1);
        let target = self.options.artifacts_dir.join(FAILURES_DIR).join(name);

        let capture = async {
            let bytes = session.capture(&target).await?;
            persist(&target, &bytes).await
        };
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            outcome = tokio::time::timeout(self.options.step_timeout, capture) => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                tracing::info!("Saved failure screenshot to {}", target.display());
                Some(target)
            }
            Ok(Err(e)) => {
                tracing::warn!("Could not save failure screenshot: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("Failure screenshot timed out after {:?}", self.options.step_timeout);
                None
            }
        }
    }

    async fn teardown(&self, session: &mut dyn Session) -> Result<()> {
        let bound = self.options.teardown_timeout;
        tokio::time::timeout(bound, session.close())
            .await
            .map_err(|_| Error::Session(format!("teardown timed out after {:?}", bound)))?
    }
}

/// Write a capture, creating parent directories as needed
async fn persist(target: &Path, bytes: &[u8]) -> StepResult<()> {
    let display = target.display().to_string();
    if bytes.is_empty() {
        return Err(StepError::capture(&display, "browser returned an empty image"));
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StepError::capture(&display, e))?;
    }
    tokio::fs::write(target, bytes)
        .await
        .map_err(|e| StepError::capture(&display, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{builtin, ScenarioId};
    use crate::session::{Selection, SimulatedDriver};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn runner(driver: &SimulatedDriver, dir: &Path) -> Runner {
        Runner::new(
            Arc::new(driver.clone()),
            RunOptions {
                artifacts_dir: dir.to_path_buf(),
                ..RunOptions::default()
            },
        )
    }

    fn broken() -> Scenario {
        Scenario::new(
            ScenarioId::new("Broken"),
            vec![
                Step::Navigate {
                    url: builtin::STOREFRONT_URL.to_string(),
                },
                Step::Click {
                    selector: "#missing".to_string(),
                },
                Step::Screenshot {
                    path: PathBuf::from("never.png"),
                },
            ],
        )
    }

    /// Driver whose sessions misbehave in configurable ways
    #[derive(Default)]
    struct ScriptedDriver {
        /// Value the select reports after any choice
        select_lands_on: Option<&'static str>,
        navigate_delay: Duration,
        close_hangs: bool,
        opened: Arc<AtomicUsize>,
    }

    struct ScriptedSession {
        select_lands_on: Option<&'static str>,
        navigate_delay: Duration,
        close_hangs: bool,
    }

    #[async_trait]
    impl Driver for ScriptedDriver {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn open(&self) -> Result<Box<dyn Session>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                select_lands_on: self.select_lands_on,
                navigate_delay: self.navigate_delay,
                close_hangs: self.close_hangs,
            }))
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn navigate(&mut self, _url: &str) -> StepResult<()> {
            tokio::time::sleep(self.navigate_delay).await;
            Ok(())
        }

        async fn fill(&mut self, _selector: &str, _value: &str) -> StepResult<()> {
            Ok(())
        }

        async fn click(&mut self, _selector: &str) -> StepResult<()> {
            Ok(())
        }

        async fn select_option(&mut self, _selector: &str, value: &str) -> StepResult<Selection> {
            Ok(Selection {
                matched: value.to_string(),
                value: self.select_lands_on.unwrap_or(value).to_string(),
            })
        }

        async fn capture(&mut self, _path: &Path) -> StepResult<Vec<u8>> {
            Ok(b"image".to_vec())
        }

        async fn close(&mut self) -> Result<()> {
            if self.close_hangs {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn scripted_runner(driver: ScriptedDriver, dir: &Path) -> Runner {
        Runner::new(
            Arc::new(driver),
            RunOptions {
                teardown_timeout: Duration::from_millis(100),
                artifacts_dir: dir.to_path_buf(),
                ..RunOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_valid_login_writes_screenshot() {
        let dir = tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let outcome = runner(&driver, dir.path())
            .run(&builtin::valid_login())
            .await
            .unwrap();

        assert_eq!(outcome.steps_run, 5);
        assert_eq!(outcome.captures.len(), 1);
        assert_eq!(outcome.captures[0].step_index, 4);

        let shot = dir.path().join("products_page_verified.png");
        assert!(std::fs::metadata(&shot).unwrap().len() > 0);
        assert_eq!(driver.probe().closed(), 1);
        assert!(!dir.path().join(FAILURES_DIR).exists());
    }

    #[tokio::test]
    async fn test_failure_stops_later_steps_and_closes_once() {
        let dir = tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);

        let err = runner(&driver, dir.path()).run(&broken()).await.unwrap_err();
        match err {
            Error::StepFailed {
                index,
                step,
                source,
                screenshot,
            } => {
                assert_eq!(index, 1);
                assert_eq!(step.selector(), Some("#missing"));
                assert_eq!(source, StepError::not_found("#missing", 0));
                assert_eq!(
                    screenshot,
                    Some(dir.path().join("failures/broken_step2.png"))
                );
            }
            other => panic!("Expected StepFailed, got {other:?}"),
        }

        let probe = driver.probe();
        // navigate, click, then the failure capture
        assert_eq!(probe.actions(), vec![
            "navigate https://www.saucedemo.com",
            "click #missing",
            "capture",
        ]);
        assert_eq!(probe.opened(), 1);
        assert_eq!(probe.closed(), 1);
        assert!(!dir.path().join("never.png").exists());

        let saved = std::fs::read(dir.path().join("failures/broken_step2.png")).unwrap();
        assert!(String::from_utf8_lossy(&saved).contains("\"screen\": \"login\""));
    }

    #[tokio::test]
    async fn test_failure_screenshot_can_be_disabled() {
        let dir = tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let runner = Runner::new(
            Arc::new(driver.clone()),
            RunOptions {
                artifacts_dir: dir.path().to_path_buf(),
                failure_screenshots: false,
                ..RunOptions::default()
            },
        );

        let err = runner.run(&broken()).await.unwrap_err();
        assert!(matches!(err, Error::StepFailed { screenshot: None, .. }));
        assert_eq!(driver.probe().actions().len(), 2);
        assert!(!dir.path().join(FAILURES_DIR).exists());
    }

    #[tokio::test]
    async fn test_unwritable_failure_screenshot_keeps_step_error() {
        let dir = tempdir().unwrap();
        // a regular file where the failures directory should go
        std::fs::write(dir.path().join(FAILURES_DIR), b"x").unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);

        let err = runner(&driver, dir.path()).run(&broken()).await.unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_FOUND");
        assert!(matches!(err, Error::StepFailed { screenshot: None, .. }));
        assert_eq!(driver.probe().closed(), 1);
    }

    #[tokio::test]
    async fn test_step_timeout_is_reported_and_session_closed() {
        let dir = tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL)
            .with_latency(Duration::from_millis(200));
        let runner = Runner::new(
            Arc::new(driver.clone()),
            RunOptions {
                navigation_timeout: Duration::from_millis(20),
                step_timeout: Duration::from_millis(20),
                artifacts_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );

        let err = runner.run(&builtin::valid_login()).await.unwrap_err();
        match err {
            Error::StepFailed { index, source, .. } => {
                assert_eq!(index, 0);
                assert!(matches!(source, StepError::Timeout { ref action, .. } if action == "navigate"));
            }
            other => panic!("Expected timeout, got {other:?}"),
        }
        assert_eq!(driver.probe().closed(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_closes_session_first() {
        let dir = tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL)
            .with_latency(Duration::from_millis(50));
        let runner = runner(&driver, dir.path());
        let token = runner.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            token.cancel();
        });

        let err = runner.run(&builtin::ecommerce_flow()).await.unwrap_err();
        let Error::Cancelled { index } = err else {
            panic!("Expected Cancelled, got {err:?}");
        };
        assert!(index < builtin::ecommerce_flow().steps().len());

        let probe = driver.probe();
        assert_eq!(probe.closed(), 1);
        assert_eq!(probe.actions().len(), index + 1);
        assert!(!dir.path().join(FAILURES_DIR).exists());
    }

    #[tokio::test]
    async fn test_cancelled_runner_never_opens_session() {
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let runner = runner(&driver, Path::new("."));
        runner.cancellation_token().cancel();

        let err = runner.run(&builtin::valid_login()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { index: 0 }));
        assert_eq!(driver.probe().opened(), 0);
        assert_eq!(driver.probe().closed(), 0);
    }

    #[tokio::test]
    async fn test_select_landing_on_other_value_fails() {
        let dir = tempdir().unwrap();
        let driver = ScriptedDriver {
            select_lands_on: Some("hilo"),
            ..ScriptedDriver::default()
        };

        let err = scripted_runner(driver, dir.path())
            .run(&builtin::sort_products())
            .await
            .unwrap_err();
        match err {
            Error::StepFailed { index, source, .. } => {
                assert_eq!(index, 4);
                assert_eq!(source.code(), "NOT_INTERACTABLE");
                assert!(source.to_string().contains("'hilo'"), "{source}");
            }
            other => panic!("Expected StepFailed, got {other:?}"),
        }
        assert!(!dir.path().join("products_sorted_a_to_z.png").exists());
    }

    #[tokio::test]
    async fn test_hanging_teardown_is_bounded_after_cancel() {
        let dir = tempdir().unwrap();
        let driver = ScriptedDriver {
            navigate_delay: Duration::from_secs(5),
            close_hangs: true,
            ..ScriptedDriver::default()
        };
        let runner = scripted_runner(driver, dir.path());
        let token = runner.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(3), runner.run(&builtin::valid_login()))
            .await
            .expect("run must return once teardown times out");
        assert!(matches!(result, Err(Error::Cancelled { index: 0 })));
    }

    #[tokio::test]
    async fn test_hanging_teardown_after_clean_run_is_session_error() {
        let dir = tempdir().unwrap();
        let opened = Arc::new(AtomicUsize::new(0));
        let driver = ScriptedDriver {
            close_hangs: true,
            opened: Arc::clone(&opened),
            ..ScriptedDriver::default()
        };

        let err = scripted_runner(driver, dir.path())
            .run(&builtin::valid_login())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION");
        assert!(err.to_string().contains("teardown timed out"), "{err}");
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_scenario_never_opens_session() {
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let scenario = Scenario::new(ScenarioId::new("Empty"), vec![]);

        let err = runner(&driver, Path::new("."))
            .run(&scenario)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidScenario { .. }));
        assert_eq!(driver.probe().opened(), 0);
    }

    #[tokio::test]
    async fn test_capture_to_unwritable_path_is_capture_error() {
        let dir = tempdir().unwrap();
        // a regular file where a directory is expected
        std::fs::write(dir.path().join("blocked"), b"x").unwrap();

        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let scenario = Scenario::new(
            ScenarioId::new("Blocked"),
            vec![
                Step::Navigate {
                    url: builtin::STOREFRONT_URL.to_string(),
                },
                Step::Screenshot {
                    path: PathBuf::from("blocked/shot.png"),
                },
            ],
        );

        let err = runner(&driver, dir.path()).run(&scenario).await.unwrap_err();
        assert_eq!(err.code(), "CAPTURE");
        assert_eq!(driver.probe().closed(), 1);
    }
}
