//! Error types for regcheck

use thiserror::Error;

/// Result type alias using regcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// regcheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),

    #[error("Unknown browser engine: {0} (expected chromium, firefox or webkit)")]
    UnknownBrowser(String),
}
