//! Registration form test harness
//!
//! This crate runs a catalog of registration test cases against a target and
//! turns the results into a report:
//! - Builds the registration catalog (or loads one from YAML)
//! - Submits each payload through a pluggable executor (simulated, HTTP, browser)
//! - Classifies every outcome against the case's expectation
//! - Aggregates results into a console report and a JSON document
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TestRunner                           │
//! │    ├── acquire()         once, before the first case        │
//! │    ├── execute(payload)  per case -> ExecutionOutcome       │
//! │    ├── classify(expected, outcome) -> TestResult            │
//! │    └── release()         once, on every path                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Executor                                                   │
//! │    ├── SimulatedExecutor   in-process validation rules      │
//! │    ├── HttpExecutor        POST <base>/register             │
//! │    └── BrowserExecutor     Playwright driver over stdio     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Report::aggregate -> text / ReportDocument (JSON)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod browser;
pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod http;
pub mod report;
pub mod runner;
pub mod simulated;

pub use catalog::{CaseFilter, Catalog};
pub use dashboard::DashboardSummary;
pub use error::{E2eError, E2eResult};
pub use executor::{build_executor, Executor, ExecutorKind};
pub use report::{Report, ReportDocument, ReportOptions};
pub use runner::{classify, RunLog, TestRunner};
pub use simulated::{LatencyProfile, SimulatedExecutor};
