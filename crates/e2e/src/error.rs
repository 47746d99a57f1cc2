//! Error types for the registration harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// The executor could not acquire its session resource; fatal to the run
    #[error("Setup failed for {executor} executor: {reason}")]
    Setup { executor: String, reason: String },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright driver error: {0}")]
    Playwright(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Duplicate test case id: {0}")]
    DuplicateCase(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Executor session is not open")]
    SessionClosed,

    #[error("No report matching registration_test_report_*.json in {0}")]
    NoReports(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] regcheck_common::Error),
}

impl E2eError {
    pub fn setup(executor: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        E2eError::Setup {
            executor: executor.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborted the run before any case executed
    pub fn is_setup(&self) -> bool {
        matches!(self, E2eError::Setup { .. } | E2eError::PlaywrightNotFound)
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
