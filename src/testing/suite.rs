//! Suite execution
//!
//! Runs independent scenarios with bounded concurrency. Each scenario gets
//! its own session; results come back in input order regardless of which
//! run finishes first.

use std::time::Instant;

use futures_util::stream::{self, StreamExt};

use super::report::{RunReport, SuiteReport};
use super::runner::Runner;
use crate::scenario::Scenario;

/// Run every scenario, at most `jobs` at a time
pub async fn run_suite(runner: &Runner, scenarios: &[Scenario], jobs: usize) -> SuiteReport {
    run_suite_with(runner, scenarios, jobs, |_| {}).await
}

/// Like [`run_suite`], calling `on_result` as each report becomes available
///
/// Reports are delivered in input order.
pub async fn run_suite_with<F>(
    runner: &Runner,
    scenarios: &[Scenario],
    jobs: usize,
    mut on_result: F,
) -> SuiteReport
where
    F: FnMut(&RunReport),
{
    let jobs = jobs.max(1);
    let mut suite = SuiteReport::new(runner.driver_name());
    tracing::info!(
        run_id = %suite.run_id,
        scenarios = scenarios.len(),
        jobs,
        "Starting suite"
    );

    let mut reports = stream::iter(scenarios)
        .map(|scenario| async move {
            let started = Instant::now();
            let result = runner.run(scenario).await;
            let elapsed = started.elapsed().as_millis() as u64;
            RunReport::from_result(scenario, &result, elapsed)
        })
        .buffered(jobs);

    while let Some(report) = reports.next().await {
        on_result(&report);
        suite.results.push(report);
    }

    tracing::info!(
        run_id = %suite.run_id,
        passed = suite.passed(),
        total = suite.total(),
        "Suite finished"
    );
    suite
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::builtin;
    use crate::session::SimulatedDriver;
    use crate::testing::runner::RunOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_builtin_suite_passes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let runner = Runner::new(
            Arc::new(driver.clone()),
            RunOptions {
                artifacts_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );

        let scenarios = builtin::all();
        let mut seen = Vec::new();
        let suite = run_suite_with(&runner, &scenarios, 3, |r| seen.push(r.scenario.clone())).await;

        assert!(suite.all_passed(), "{:?}", suite.results);
        assert_eq!(suite.driver, "simulated");
        let expected: Vec<String> = scenarios.iter().map(|s| s.title()).collect();
        assert_eq!(seen, expected);

        let probe = driver.probe();
        assert_eq!(probe.opened(), scenarios.len());
        assert_eq!(probe.closed(), scenarios.len());
    }

    #[tokio::test]
    async fn test_cancelled_suite_opens_no_sessions() {
        let driver = SimulatedDriver::new(builtin::STOREFRONT_URL);
        let runner = Runner::new(Arc::new(driver.clone()), RunOptions::default());
        runner.cancellation_token().cancel();

        let suite = run_suite(&runner, &builtin::all(), 1).await;
        let codes: Vec<_> = suite
            .results
            .iter()
            .map(|r| r.failure.as_ref().unwrap().code.as_str())
            .collect();
        assert_eq!(codes, vec!["CANCELLED"; 4]);
        assert_eq!(driver.probe().opened(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_suite() {
        let dir = tempfile::tempdir().unwrap();
        // unreachable host fails every navigate
        let driver = SimulatedDriver::new("https://unreachable.invalid");
        let runner = Runner::new(
            Arc::new(driver),
            RunOptions {
                artifacts_dir: dir.path().to_path_buf(),
                ..RunOptions::default()
            },
        );

        let suite = run_suite(&runner, &builtin::all(), 0).await;
        assert_eq!(suite.total(), 4);
        assert_eq!(suite.passed(), 0);
        for report in &suite.results {
            let failure = report.failure.as_ref().unwrap();
            assert_eq!(failure.code, "NAVIGATION");
            assert_eq!(failure.step_index, Some(0));
        }
    }
}
