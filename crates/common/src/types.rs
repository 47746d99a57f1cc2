//! Core types for regcheck

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Test case category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Positive,
    Negative,
    Boundary,
    Security,
    #[serde(rename = "UI_UX", alias = "ui_ux")]
    UiUx,
    Performance,
    Accessibility,
    Integration,
    Other,
}

impl Category {
    /// Fixed execution order of categories within a catalog
    pub const ORDER: [Category; 9] = [
        Category::Positive,
        Category::Negative,
        Category::Boundary,
        Category::Security,
        Category::UiUx,
        Category::Performance,
        Category::Accessibility,
        Category::Integration,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Positive => "Positive",
            Category::Negative => "Negative",
            Category::Boundary => "Boundary",
            Category::Security => "Security",
            Category::UiUx => "UI_UX",
            Category::Performance => "Performance",
            Category::Accessibility => "Accessibility",
            Category::Integration => "Integration",
            Category::Other => "Other",
        }
    }

    /// Position of this category in [`Category::ORDER`]
    pub fn rank(&self) -> usize {
        Self::ORDER.iter().position(|c| c == self).unwrap_or(Self::ORDER.len())
    }

    /// Infer the category of a registration case from its `REG_nnn` prefix.
    ///
    /// Report documents written by older runners carry no category field;
    /// unknown identifiers map to [`Category::Other`].
    pub fn from_test_id(test_id: &str) -> Self {
        match case_number(test_id) {
            Some(1..=3) => Category::Positive,
            Some(4..=11) => Category::Negative,
            Some(12..=14) => Category::Boundary,
            Some(15..=18) => Category::Security,
            Some(19..=22) => Category::UiUx,
            Some(23..=24) => Category::Performance,
            Some(25..=27) => Category::Accessibility,
            Some(28..=30) => Category::Integration,
            _ => Category::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "positive" => Ok(Category::Positive),
            "negative" => Ok(Category::Negative),
            "boundary" => Ok(Category::Boundary),
            "security" => Ok(Category::Security),
            "uiux" => Ok(Category::UiUx),
            "performance" => Ok(Category::Performance),
            "accessibility" => Ok(Category::Accessibility),
            "integration" => Ok(Category::Integration),
            "other" => Ok(Category::Other),
            _ => Err(Error::UnknownCategory(s.to_string())),
        }
    }
}

/// Test case priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "high")]
    High,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Infer the priority of a registration case from its `REG_nnn` prefix
    pub fn from_test_id(test_id: &str) -> Self {
        match case_number(test_id) {
            Some(1 | 2 | 4..=11 | 15..=17 | 28 | 30) => Priority::High,
            Some(14 | 20 | 21 | 27) => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(Error::UnknownPriority(s.to_string())),
        }
    }
}

/// Browser engine driven by the Playwright executor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserEngine {
    /// Name of the Playwright launcher object
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Webkit => "webkit",
        }
    }
}

impl std::fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" => Ok(BrowserEngine::Chromium),
            "firefox" => Ok(BrowserEngine::Firefox),
            "webkit" => Ok(BrowserEngine::Webkit),
            _ => Err(Error::UnknownBrowser(s.to_string())),
        }
    }
}

/// Extract `nnn` from identifiers shaped like `REG_nnn`, `REG_nnn_k` or `REG_nnna`
fn case_number(test_id: &str) -> Option<u32> {
    let rest = test_id.strip_prefix("REG_")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Form payload: field name -> submitted value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Value of a field, treating a missing field as empty
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Expected outcome of a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Registration must succeed
    Success,
    /// Registration must be rejected; the message must contain the
    /// substring (case-insensitive) when one is given
    Error(Option<String>),
}

impl Expectation {
    pub fn error() -> Self {
        Self::Error(None)
    }

    pub fn error_containing(substring: impl Into<String>) -> Self {
        Self::Error(Some(substring.into()))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Expectation::Success)
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::Success => f.write_str("success"),
            Expectation::Error(None) => f.write_str("error"),
            Expectation::Error(Some(s)) => write!(f, "error containing '{}'", s),
        }
    }
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub payload: Payload,
    pub expected: Expectation,
}

/// Raw result of one executor invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    /// Elapsed time as observed by the executor (the response time)
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn success(status_code: Option<u16>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            status_code,
            message: Some(message.into()),
            elapsed,
        }
    }

    pub fn failure(status_code: Option<u16>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            status_code,
            message: Some(message.into()),
            elapsed,
        }
    }
}

/// Per-case lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Running,
    Passed,
    Failed,
}

impl CaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseState::Passed | CaseState::Failed)
    }
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseState::Pending => write!(f, "pending"),
            CaseState::Running => write!(f, "running"),
            CaseState::Passed => write!(f, "passed"),
            CaseState::Failed => write!(f, "failed"),
        }
    }
}

/// Recorded verdict for one executed case
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub test_id: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub passed: bool,
    /// Wall-clock time measured around the executor call
    pub execution_time: Duration,
    /// Response time reported by the executor, absent when it failed
    pub response_time: Option<Duration>,
    pub status_code: Option<u16>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    /// Result for a case whose executor produced an outcome
    pub fn from_outcome(
        case: &TestCase,
        outcome: &ExecutionOutcome,
        passed: bool,
        execution_time: Duration,
    ) -> Self {
        Self {
            test_id: case.id.clone(),
            description: case.description.clone(),
            category: case.category,
            priority: case.priority,
            passed,
            execution_time,
            response_time: Some(outcome.elapsed),
            status_code: outcome.status_code,
            message: outcome
                .message
                .clone()
                .unwrap_or_else(|| if outcome.success { "success" } else { "no message" }.to_string()),
            timestamp: Utc::now(),
        }
    }

    /// Result for a case whose executor failed before producing an outcome
    pub fn failed(case: &TestCase, reason: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            test_id: case.id.clone(),
            description: case.description.clone(),
            category: case.category,
            priority: case.priority,
            passed: false,
            execution_time,
            response_time: None,
            status_code: None,
            message: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> CaseState {
        if self.passed {
            CaseState::Passed
        } else {
            CaseState::Failed
        }
    }
}
