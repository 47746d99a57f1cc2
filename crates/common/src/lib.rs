//! regcheck Common Library
//!
//! Shared data model, configuration and error types for the regcheck
//! registration-form test harness.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{HarnessConfig, MAX_DURATION_SECS};
pub use error::{Error, Result};
pub use types::*;

/// Prefix shared by every report artifact written by the harness
pub const REPORT_FILE_PREFIX: &str = "registration_test_report_";

/// Default location of the harness configuration file
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from("regcheck.toml")
}
