//! regcheck CLI
//!
//! Command-line interface for running the registration test catalog and
//! inspecting stored reports.

pub mod commands;
pub mod output;
