//! CLI Commands

pub mod catalog;
pub mod dashboard;
pub mod run;
