//! Text dashboard over a stored report

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use regcheck_common::{Category, TestResult};

use crate::artifact::{latest_report, read_report};
use crate::error::E2eResult;
use crate::report::{Breakdown, Report, ReportDocument};

/// Per-category line of the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub category: Category,
    pub breakdown: Breakdown,
    /// Mean response time in seconds over cases that reported one
    pub avg_response_time: Option<f64>,
}

/// Summary rebuilt from a report document
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub source: Option<PathBuf>,
    /// Results rebuilt from the document
    pub results: Vec<TestResult>,
    pub report: Report,
    pub categories: Vec<CategoryRow>,
}

impl DashboardSummary {
    /// Re-aggregate the document's results; the stored summary is not trusted
    pub fn from_document(document: &ReportDocument) -> Self {
        let results = document.to_results();
        let report = Report::aggregate(&results, &document.options());

        let categories = report
            .categories
            .iter()
            .map(|(category, breakdown)| {
                let times: Vec<f64> = results
                    .iter()
                    .filter(|r| r.category == *category)
                    .filter_map(|r| r.response_time.map(|t| t.as_secs_f64()))
                    .collect();
                CategoryRow {
                    category: *category,
                    breakdown: *breakdown,
                    avg_response_time: if times.is_empty() {
                        None
                    } else {
                        Some(times.iter().sum::<f64>() / times.len() as f64)
                    },
                }
            })
            .collect();

        Self {
            source: None,
            results,
            report,
            categories,
        }
    }

    pub fn load(path: &Path) -> E2eResult<Self> {
        info!("Loading test report: {}", path.display());
        let document = read_report(path)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            ..Self::from_document(&document)
        })
    }

    /// Load the newest `registration_test_report_*.json` in `dir`
    pub fn load_latest(dir: &Path) -> E2eResult<Self> {
        Self::load(&latest_report(dir)?)
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Document rendered from the recomputed aggregate
    pub fn to_document(&self) -> ReportDocument {
        ReportDocument::from_report(&self.report, &self.results)
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.report;
        let rule = "=".repeat(60);

        writeln!(f, "{}", rule)?;
        writeln!(f, "TEST RESULTS DASHBOARD SUMMARY")?;
        writeln!(f, "{}", rule)?;
        if let Some(source) = &self.source {
            writeln!(f, "Report:     {}", source.display())?;
        }
        writeln!(f, "Target:     {}", report.environment)?;
        writeln!(f, "Execution:  {}", report.execution_time.to_rfc3339())?;
        writeln!(
            f,
            "Results:    {}/{} passed ({:.1}%)",
            report.passed, report.total, report.pass_rate
        )?;

        writeln!(f)?;
        writeln!(f, "PERFORMANCE:")?;
        match &report.response {
            Some(stats) => {
                writeln!(f, "  Average:  {:.2}s", stats.mean)?;
                writeln!(f, "  Range:    {:.2}s - {:.2}s", stats.min, stats.max)?;
                writeln!(f, "  Std dev:  {:.2}s", stats.std_dev)?;
                writeln!(
                    f,
                    "  Under {:.0}s: {}/{} tests",
                    report.threshold.as_secs_f64(),
                    report.under_threshold,
                    stats.samples
                )?;
            }
            None => writeln!(f, "  no response times recorded")?,
        }

        if !report.status_codes.is_empty() {
            writeln!(f)?;
            writeln!(f, "STATUS CODES:")?;
            for (code, count) in &report.status_codes {
                writeln!(f, "  {}: {}", code, count)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "CATEGORIES:")?;
        for row in &self.categories {
            let avg = row
                .avg_response_time
                .map(|t| format!("{:.2}s avg", t))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "  {}: {} tests, {:.0}% pass, {}",
                row.category, row.breakdown.count, row.breakdown.pass_rate, avg
            )?;
        }
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ReportDocument {
        serde_json::from_str(
            r#"{
                "summary": {
                    "total_tests": 3, "passed": 2, "failed": 1, "pass_rate": 66.7,
                    "execution_time": "2024-03-01T10:00:00",
                    "test_environment": "http://localhost:5003"
                },
                "test_results": [
                    {"test_id": "REG_001", "passed": true,
                     "actual_response": {"response_time": 1.0, "status_code": 201},
                     "execution_time": 1.1, "result_message": "ok", "timestamp": ""},
                    {"test_id": "REG_002", "passed": true,
                     "actual_response": {"response_time": 2.0, "status_code": 201},
                     "execution_time": 2.1, "result_message": "ok", "timestamp": ""},
                    {"test_id": "REG_015_1", "passed": false,
                     "actual_response": {"response_time": null, "status_code": null},
                     "execution_time": 0.1, "result_message": "timeout", "timestamp": ""}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_category_averages() {
        let summary = DashboardSummary::from_document(&document());
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.categories[0].category, Category::Positive);
        assert_eq!(summary.categories[0].avg_response_time, Some(1.5));
        assert_eq!(summary.categories[1].category, Category::Security);
        assert_eq!(summary.categories[1].avg_response_time, None);
    }

    #[test]
    fn test_recomputes_from_results() {
        let summary = DashboardSummary::from_document(&document());
        assert_eq!(summary.report.total, 3);
        assert_eq!(summary.report.under_threshold, 2);
        assert_eq!(summary.report.status_codes, vec![(201, 2)]);

        let text = summary.render_text();
        assert!(text.contains("Results:    2/3 passed (66.7%)"));
        assert!(text.contains("Positive: 2 tests, 100% pass, 1.50s avg"));
        assert!(text.contains("Security: 1 tests, 0% pass, n/a"));
    }

    #[test]
    fn test_load_latest() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("registration_test_report_1.json"),
            serde_json::to_string(&document()).unwrap(),
        )
        .unwrap();
        let summary = DashboardSummary::load_latest(dir.path()).unwrap();
        assert!(summary.source.is_some());
        assert_eq!(summary.report.environment, "http://localhost:5003");
    }
}
