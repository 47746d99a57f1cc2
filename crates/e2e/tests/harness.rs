//! Harness behaviour against scripted executors
//!
//! Run with: cargo test --package regcheck-e2e --test harness

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use regcheck_common::{Category, ExecutionOutcome, Expectation, Payload, Priority, TestCase};
use regcheck_e2e::artifact::{latest_report, read_report, write_report_at};
use regcheck_e2e::{
    E2eError, E2eResult, Executor, LatencyProfile, ReportDocument, SimulatedExecutor, TestRunner,
};
use regcheck_e2e::Catalog;

enum Step {
    Outcome(ExecutionOutcome),
    Fail(&'static str),
    Panic,
    Hang,
}

/// Executor that replays a fixed script and records its lifecycle
struct Scripted {
    steps: VecDeque<Step>,
    fail_acquire: bool,
    executed: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            fail_acquire: false,
            executed: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Executor for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn environment(&self) -> String {
        "test".to_string()
    }

    async fn acquire(&mut self) -> E2eResult<()> {
        if self.fail_acquire {
            return Err(E2eError::setup("scripted", "driver unavailable"));
        }
        Ok(())
    }

    async fn execute(&mut self, _payload: &Payload) -> E2eResult<ExecutionOutcome> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Outcome(outcome)) => Ok(outcome),
            Some(Step::Fail(reason)) => Err(E2eError::ElementNotFound(reason.to_string())),
            Some(Step::Panic) => panic!("driver crashed"),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
            None => Ok(ExecutionOutcome::success(Some(201), "ok", Duration::from_millis(5))),
        }
    }

    async fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

fn case(id: &str, expected: Expectation) -> TestCase {
    TestCase {
        id: id.to_string(),
        description: format!("case {}", id),
        category: Category::Negative,
        priority: Priority::High,
        payload: Payload::new().with("username", "someone"),
        expected,
    }
}

fn catalog(n: usize) -> Catalog {
    Catalog::new(
        (1..=n)
            .map(|i| case(&format!("T_{:03}", i), Expectation::Success))
            .collect(),
    )
    .unwrap()
}

fn ok(ms: u64) -> Step {
    Step::Outcome(ExecutionOutcome::success(Some(201), "created", Duration::from_millis(ms)))
}

fn rejected(message: &str) -> Step {
    Step::Outcome(ExecutionOutcome::failure(Some(400), message, Duration::from_millis(5)))
}

#[tokio::test]
async fn one_result_per_case() {
    let catalog = catalog(5);
    let mut executor = Scripted::new(vec![]);
    let log = TestRunner::new().run(&catalog, &mut executor).await.unwrap();

    assert_eq!(log.results.len(), catalog.len());
    let ids: Vec<_> = log.results.iter().map(|r| r.test_id.as_str()).collect();
    assert_eq!(ids, ["T_001", "T_002", "T_003", "T_004", "T_005"]);
    assert!(!log.interrupted);
    assert!(executor.released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn outcomes_are_classified_against_expectations() {
    let catalog = Catalog::new(vec![
        case("T_001", Expectation::Success),
        case("T_002", Expectation::Success),
        case("T_003", Expectation::error_containing("invalid characters")),
        case("T_004", Expectation::error_containing("invalid characters")),
        case("T_005", Expectation::error()),
    ])
    .unwrap();
    let mut executor = Scripted::new(vec![
        ok(10),
        rejected("Email is required"),
        rejected("Invalid characters in username"),
        rejected("Email is required"),
        ok(10),
    ]);

    let log = TestRunner::new().run(&catalog, &mut executor).await.unwrap();
    let verdicts: Vec<_> = log.results.iter().map(|r| r.passed).collect();
    assert_eq!(verdicts, [true, false, true, false, false]);
    assert_eq!(log.results[1].status_code, Some(400));
    assert_eq!(log.results[0].response_time, Some(Duration::from_millis(10)));
}

#[tokio::test]
async fn setup_failure_yields_no_results() {
    let mut executor = Scripted::new(vec![]);
    executor.fail_acquire = true;
    let executed = executor.executed.clone();
    let released = executor.released.clone();

    let err = TestRunner::new()
        .run(&catalog(3), &mut executor)
        .await
        .unwrap_err();

    assert!(err.is_setup());
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn executor_errors_and_panics_do_not_stop_the_run() {
    let mut executor = Scripted::new(vec![ok(1), Step::Fail("#email"), Step::Panic, ok(1)]);
    let log = TestRunner::new().run(&catalog(4), &mut executor).await.unwrap();

    assert_eq!(log.results.len(), 4);
    assert!(log.results[0].passed);
    assert!(!log.results[1].passed);
    assert!(log.results[1].message.contains("#email"));
    assert_eq!(log.results[1].response_time, None);
    assert!(!log.results[2].passed);
    assert!(log.results[2].message.contains("driver crashed"));
    assert!(log.results[3].passed);
    assert!(executor.released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancellation_keeps_partial_log_and_releases() {
    let runner = TestRunner::new();
    let token = runner.cancellation_token();
    let mut executor = Scripted::new(vec![ok(1), ok(1), Step::Hang]);
    let released = executor.released.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let log = runner.run(&catalog(5), &mut executor).await.unwrap();
    assert!(log.interrupted);
    assert_eq!(log.results.len(), 2);
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn observer_sees_every_result() {
    let mut seen = Vec::new();
    let mut executor = Scripted::new(vec![]);
    let log = TestRunner::new()
        .run_observed(&catalog(3), &mut executor, |r| seen.push(r.test_id.clone()))
        .await
        .unwrap();
    assert_eq!(seen.len(), log.results.len());
}

#[tokio::test]
async fn simulated_registration_run() {
    let catalog = Catalog::registration(1_700_000_000).unwrap();
    let mut executor = SimulatedExecutor::seeded(42, LatencyProfile::default());
    let log = TestRunner::new().run(&catalog, &mut executor).await.unwrap();

    assert_eq!(log.results.len(), catalog.len());
    assert!(log.results.iter().all(|r| r.status_code.is_some()));

    for id in ["REG_015_1", "REG_016_1"] {
        let result = log.results.iter().find(|r| r.test_id == id).unwrap();
        assert_eq!(result.message, "Invalid characters in username");
        assert!(result.passed, "{} should pass", id);
    }

    let minimal = log.results.iter().find(|r| r.test_id == "REG_002").unwrap();
    assert!(minimal.passed);
    assert_eq!(minimal.status_code, Some(201));
}

#[tokio::test]
async fn report_written_after_run_is_latest() {
    let dir = tempfile::TempDir::new().unwrap();
    let catalog = Catalog::registration(1_700_000_000).unwrap();
    let mut executor = SimulatedExecutor::seeded(7, LatencyProfile::default());
    let log = TestRunner::new().run(&catalog, &mut executor).await.unwrap();

    let (report, document) = ReportDocument::from_run(&log, 3.0);
    write_report_at(dir.path(), &document, 1_700_000_000).unwrap();
    let path = write_report_at(dir.path(), &document, 1_700_000_060).unwrap();

    assert_eq!(latest_report(dir.path()).unwrap(), path);
    let stored = read_report(&path).unwrap();
    assert_eq!(stored.summary.total_tests, report.total);
    assert_eq!(stored.test_results.len(), catalog.len());
    assert_eq!(stored.summary.executor, "simulated");
}
