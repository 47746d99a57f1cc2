//! The executor seam: turns a form payload into an [`ExecutionOutcome`]

use async_trait::async_trait;

use regcheck_common::{ExecutionOutcome, Payload};

use crate::error::E2eResult;

/// Pluggable capability that submits one registration payload to a target.
///
/// The harness calls [`acquire`](Executor::acquire) once before the first
/// case and [`release`](Executor::release) once after the last one (on every
/// path, including interruption). Errors returned from `execute` are turned
/// into failed results by the harness; only `acquire` errors abort a run.
#[async_trait]
pub trait Executor: Send {
    /// Short name used in logs and reports ("simulated", "http", "browser")
    fn name(&self) -> &str;

    /// Label of the system under test, written to the report summary
    fn environment(&self) -> String;

    /// Acquire the session resource held for the whole run
    async fn acquire(&mut self) -> E2eResult<()> {
        Ok(())
    }

    /// Submit one payload
    async fn execute(&mut self, payload: &Payload) -> E2eResult<ExecutionOutcome>;

    /// Release the session resource; must be safe to call more than once
    async fn release(&mut self) {}
}

/// Kind of executor selectable from configuration and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    #[default]
    Simulated,
    Http,
    Browser,
}

impl ExecutorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Simulated => "simulated",
            ExecutorKind::Http => "http",
            ExecutorKind::Browser => "browser",
        }
    }
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the executor of the given kind from the harness configuration
pub fn build_executor(
    kind: ExecutorKind,
    config: &regcheck_common::HarnessConfig,
) -> E2eResult<Box<dyn Executor>> {
    Ok(match kind {
        ExecutorKind::Simulated => Box::new(crate::simulated::SimulatedExecutor::from_config(config)),
        ExecutorKind::Http => Box::new(crate::http::HttpExecutor::new(config)?),
        ExecutorKind::Browser => Box::new(crate::browser::BrowserExecutor::new(config)),
    })
}
