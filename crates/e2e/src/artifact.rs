//! Report files on disk

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use regcheck_common::REPORT_FILE_PREFIX;

use crate::error::{E2eError, E2eResult};
use crate::report::ReportDocument;

/// `registration_test_report_<unix>.json`
pub fn report_file_name(unix_timestamp: i64) -> String {
    format!("{}{}.json", REPORT_FILE_PREFIX, unix_timestamp)
}

fn is_report_file(name: &str) -> bool {
    name.starts_with(REPORT_FILE_PREFIX) && name.ends_with(".json")
}

/// Write the document into `dir`, named after the current time
pub fn write_report(dir: &Path, document: &ReportDocument) -> E2eResult<PathBuf> {
    write_report_at(dir, document, chrono::Utc::now().timestamp())
}

/// Write the document into `dir` under an explicit timestamp
pub fn write_report_at(
    dir: &Path,
    document: &ReportDocument,
    unix_timestamp: i64,
) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(unix_timestamp));
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(&path, json)?;
    info!("Report written to {}", path.display());
    Ok(path)
}

/// All report files directly inside `dir`, sorted by name
pub fn list_reports(dir: &Path) -> E2eResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(E2eError::NoReports(dir.display().to_string()));
    }

    let mut reports: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(is_report_file).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    reports.sort();
    Ok(reports)
}

/// The report with the lexicographically greatest file name
pub fn latest_report(dir: &Path) -> E2eResult<PathBuf> {
    let latest = list_reports(dir)?
        .pop()
        .ok_or_else(|| E2eError::NoReports(dir.display().to_string()))?;
    debug!("Latest report: {}", latest.display());
    Ok(latest)
}

pub fn read_report(path: &Path) -> E2eResult<ReportDocument> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
