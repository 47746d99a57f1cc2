//! Execution harness: runs a catalog against an executor

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use regcheck_common::{CaseState, ExecutionOutcome, Expectation, TestCase, TestResult};

use crate::catalog::Catalog;
use crate::error::E2eResult;
use crate::executor::Executor;

/// Whether an outcome satisfies a case's expectation.
///
/// `Success` requires a successful outcome. `Error` requires a failed outcome
/// whose message contains the required substring (case-insensitive), when
/// one is given.
pub fn classify(expected: &Expectation, outcome: &ExecutionOutcome) -> bool {
    match expected {
        Expectation::Success => outcome.success,
        Expectation::Error(None) => !outcome.success,
        Expectation::Error(Some(substring)) => {
            !outcome.success
                && outcome
                    .message
                    .as_deref()
                    .map(|m| m.to_lowercase().contains(&substring.to_lowercase()))
                    .unwrap_or(false)
        }
    }
}

/// Ordered result log of one run
#[derive(Debug, Clone)]
pub struct RunLog {
    pub executor: String,
    pub environment: String,
    pub results: Vec<TestResult>,
    /// The run was cancelled before every case executed
    pub interrupted: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration: Duration,
}

impl RunLog {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

/// Sequential test runner
pub struct TestRunner {
    cancel: CancellationToken,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }

    /// Runner that stops between (or during) cases once `cancel` fires
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every case of the catalog once, in order
    pub async fn run(&self, catalog: &Catalog, executor: &mut dyn Executor) -> E2eResult<RunLog> {
        self.run_observed(catalog, executor, |_| {}).await
    }

    /// Run every case, calling `observer` with each result as it is recorded.
    ///
    /// Only a setup failure is returned as an error; in that case no result
    /// exists. Every per-case failure becomes a failed [`TestResult`].
    pub async fn run_observed(
        &self,
        catalog: &Catalog,
        executor: &mut dyn Executor,
        mut observer: impl FnMut(&TestResult),
    ) -> E2eResult<RunLog> {
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        info!(
            "Acquiring {} executor for {}",
            executor.name(),
            executor.environment()
        );
        if let Err(e) = executor.acquire().await {
            error!("Setup failed: {}", e);
            executor.release().await;
            return Err(e);
        }

        info!("Running {} test(s)...", catalog.len());

        let mut results = Vec::with_capacity(catalog.len());
        let mut interrupted = false;

        for case in catalog.cases() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = execute_case(case, executor) => Some(result),
            };

            match result {
                Some(result) => {
                    if result.passed {
                        info!("✓ {} ({} ms)", result.test_id, result.execution_time.as_millis());
                    } else {
                        error!("✗ {} - {}", result.test_id, result.message);
                    }
                    observer(&result);
                    results.push(result);
                }
                None => {
                    warn!("Run interrupted during {}", case.id);
                    interrupted = true;
                    break;
                }
            }
        }

        executor.release().await;

        let log = RunLog {
            executor: executor.name().to_string(),
            environment: executor.environment(),
            results,
            interrupted,
            started_at,
            duration: start.elapsed(),
        };

        info!(
            "Test Results: {} passed, {} failed{} ({} ms)",
            log.passed(),
            log.failed(),
            if interrupted { ", interrupted" } else { "" },
            log.duration.as_millis()
        );

        Ok(log)
    }
}

/// Execute one case; never fails, errors and panics become failed results
async fn execute_case(case: &TestCase, executor: &mut dyn Executor) -> TestResult {
    debug!("{} {}: {}", case.id, CaseState::Running, case.description);
    let start = Instant::now();

    let outcome = AssertUnwindSafe(executor.execute(&case.payload))
        .catch_unwind()
        .await;
    let execution_time = start.elapsed();

    let result = match outcome {
        Ok(Ok(outcome)) => {
            let passed = classify(&case.expected, &outcome);
            if !passed {
                debug!(
                    "{} expected {}, got {:?}",
                    case.id, case.expected, outcome.message
                );
            }
            TestResult::from_outcome(case, &outcome, passed, execution_time)
        }
        Ok(Err(e)) => TestResult::failed(case, e.to_string(), execution_time),
        Err(panic) => TestResult::failed(
            case,
            format!("Executor panicked: {}", panic_message(&*panic)),
            execution_time,
        ),
    };

    debug!("{} {}", case.id, result.state());
    result
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, message: Option<&str>) -> ExecutionOutcome {
        ExecutionOutcome {
            success,
            status_code: None,
            message: message.map(String::from),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_success_expectation() {
        assert!(classify(&Expectation::Success, &outcome(true, None)));
        assert!(!classify(&Expectation::Success, &outcome(false, Some("boom"))));
    }

    #[test]
    fn test_error_without_substring() {
        assert!(classify(&Expectation::error(), &outcome(false, None)));
        assert!(!classify(&Expectation::error(), &outcome(true, Some("ok"))));
    }

    #[test]
    fn test_error_substring_is_case_insensitive() {
        let expected = Expectation::error_containing("invalid characters");
        assert!(classify(
            &expected,
            &outcome(false, Some("Invalid Characters in username"))
        ));
        assert!(!classify(&expected, &outcome(false, Some("Email is required"))));
        assert!(!classify(&expected, &outcome(false, None)));
    }

    #[test]
    fn test_error_substring_requires_failure() {
        let expected = Expectation::error_containing("successful");
        assert!(!classify(
            &expected,
            &outcome(true, Some("Registration successful"))
        ));
    }
}
