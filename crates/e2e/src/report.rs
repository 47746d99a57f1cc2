//! Report aggregation and the JSON report document
//!
//! [`Report::aggregate`] computes every statistic once; the console text
//! ([`Report`]'s `Display`) and the serialized [`ReportDocument`] are both
//! renderings of that single value.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use regcheck_common::{Category, Priority, TestResult};

use crate::runner::RunLog;

/// Context that is not carried by the results themselves
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Response times strictly under this count as compliant
    pub performance_threshold: Duration,
    pub environment: String,
    pub executor: String,
    pub interrupted: bool,
    /// Timestamp written to the summary
    pub execution_time: DateTime<Utc>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            performance_threshold: Duration::from_secs(3),
            environment: "simulated".to_string(),
            executor: "simulated".to_string(),
            interrupted: false,
            execution_time: DateTime::<Utc>::default(),
        }
    }
}

impl ReportOptions {
    /// Thresholds too large for a `Duration` saturate
    pub fn from_run(log: &RunLog, threshold_secs: f64) -> Self {
        Self {
            performance_threshold: secs(threshold_secs),
            environment: log.environment.clone(),
            executor: log.executor.clone(),
            interrupted: log.interrupted,
            execution_time: log.started_at,
        }
    }
}

/// Count / passed / pass rate for one category or priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub count: usize,
    pub passed: usize,
    pub pass_rate: f64,
}

impl Breakdown {
    fn record(&mut self, passed: bool) {
        self.count += 1;
        if passed {
            self.passed += 1;
        }
        self.pass_rate = pass_rate(self.passed, self.count);
    }
}

/// Response-time statistics in seconds (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseStats {
    pub samples: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl ResponseStats {
    /// `None` for an empty sample set
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            samples: samples.len(),
            mean,
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureSummary {
    pub test_id: String,
    pub description: String,
    pub message: String,
}

/// A case singled out by its response time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCase {
    pub test_id: String,
    pub response_time: Duration,
}

/// Aggregate view of a result log
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    /// Mean harness-measured execution time (seconds)
    pub avg_execution_time: f64,
    /// First-appearance order
    pub categories: Vec<(Category, Breakdown)>,
    /// First-appearance order
    pub priorities: Vec<(Priority, Breakdown)>,
    pub response: Option<ResponseStats>,
    pub threshold: Duration,
    pub under_threshold: usize,
    /// Sorted by status code
    pub status_codes: Vec<(u16, usize)>,
    pub fastest: Option<TimedCase>,
    pub slowest: Option<TimedCase>,
    /// Execution order
    pub failures: Vec<FailureSummary>,
    pub environment: String,
    pub executor: String,
    pub interrupted: bool,
    pub execution_time: DateTime<Utc>,
}

fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

fn tally<K: PartialEq + Copy>(entries: &mut Vec<(K, Breakdown)>, key: K, passed: bool) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, breakdown)) => breakdown.record(passed),
        None => {
            let mut breakdown = Breakdown::default();
            breakdown.record(passed);
            entries.push((key, breakdown));
        }
    }
}

impl Report {
    /// Aggregate a result log. Pure: the same input yields the same report.
    pub fn aggregate(results: &[TestResult], options: &ReportOptions) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();

        let mut categories = Vec::new();
        let mut priorities = Vec::new();
        let mut codes: BTreeMap<u16, usize> = BTreeMap::new();
        let mut failures = Vec::new();

        for result in results {
            tally(&mut categories, result.category, result.passed);
            tally(&mut priorities, result.priority, result.passed);
            if let Some(code) = result.status_code {
                *codes.entry(code).or_default() += 1;
            }
            if !result.passed {
                failures.push(FailureSummary {
                    test_id: result.test_id.clone(),
                    description: result.description.clone(),
                    message: result.message.clone(),
                });
            }
        }

        let timed: Vec<(&str, Duration)> = results
            .iter()
            .filter_map(|r| r.response_time.map(|t| (r.test_id.as_str(), t)))
            .collect();
        let samples: Vec<f64> = timed.iter().map(|(_, t)| t.as_secs_f64()).collect();

        // Ties keep the earliest case
        let mut fastest: Option<(&str, Duration)> = None;
        let mut slowest: Option<(&str, Duration)> = None;
        for &(id, t) in &timed {
            if fastest.map_or(true, |(_, best)| t < best) {
                fastest = Some((id, t));
            }
            if slowest.map_or(true, |(_, worst)| t > worst) {
                slowest = Some((id, t));
            }
        }
        let timed_case = |(id, t): (&str, Duration)| TimedCase {
            test_id: id.to_string(),
            response_time: t,
        };

        let avg_execution_time = if total == 0 {
            0.0
        } else {
            results
                .iter()
                .map(|r| r.execution_time.as_secs_f64())
                .sum::<f64>()
                / total as f64
        };

        Self {
            total,
            passed,
            failed: total - passed,
            pass_rate: pass_rate(passed, total),
            avg_execution_time,
            categories,
            priorities,
            response: ResponseStats::from_samples(&samples),
            threshold: options.performance_threshold,
            under_threshold: timed
                .iter()
                .filter(|(_, t)| *t < options.performance_threshold)
                .count(),
            status_codes: codes.into_iter().collect(),
            fastest: fastest.map(timed_case),
            slowest: slowest.map(timed_case),
            failures,
            environment: options.environment.clone(),
            executor: options.executor.clone(),
            interrupted: options.interrupted,
            execution_time: options.execution_time,
        }
    }

    /// Console rendering
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "REGISTRATION TEST REPORT")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Environment:    {}", self.environment)?;
        writeln!(f, "Executor:       {}", self.executor)?;
        writeln!(f, "Executed at:    {}", self.execution_time.to_rfc3339())?;
        if self.interrupted {
            writeln!(f, "Status:         INTERRUPTED (partial results)")?;
        }
        writeln!(f)?;
        writeln!(f, "Total tests:    {}", self.total)?;
        writeln!(f, "Passed:         {}", self.passed)?;
        writeln!(f, "Failed:         {}", self.failed)?;
        writeln!(f, "Pass rate:      {:.1}%", self.pass_rate)?;
        writeln!(f, "Avg exec time:  {:.3}s", self.avg_execution_time)?;

        if !self.categories.is_empty() {
            writeln!(f)?;
            writeln!(f, "By category:")?;
            for (category, b) in &self.categories {
                writeln!(
                    f,
                    "  {:<14} {:>3}/{:<3} ({:.1}%)",
                    category.as_str(),
                    b.passed,
                    b.count,
                    b.pass_rate
                )?;
            }
        }

        if !self.priorities.is_empty() {
            writeln!(f)?;
            writeln!(f, "By priority:")?;
            for (priority, b) in &self.priorities {
                writeln!(
                    f,
                    "  {:<14} {:>3}/{:<3} ({:.1}%)",
                    priority.as_str(),
                    b.passed,
                    b.count,
                    b.pass_rate
                )?;
            }
        }

        writeln!(f)?;
        match &self.response {
            Some(stats) => {
                writeln!(f, "Response times ({} samples):", stats.samples)?;
                writeln!(
                    f,
                    "  mean {:.3}s  min {:.3}s  max {:.3}s  std {:.3}s",
                    stats.mean, stats.min, stats.max, stats.std_dev
                )?;
                writeln!(
                    f,
                    "  under {:.1}s: {}/{}",
                    self.threshold.as_secs_f64(),
                    self.under_threshold,
                    stats.samples
                )?;
            }
            None => writeln!(f, "Response times: n/a")?,
        }
        if let (Some(fast), Some(slow)) = (&self.fastest, &self.slowest) {
            writeln!(
                f,
                "  fastest {} ({:.3}s), slowest {} ({:.3}s)",
                fast.test_id,
                fast.response_time.as_secs_f64(),
                slow.test_id,
                slow.response_time.as_secs_f64()
            )?;
        }
        if !self.status_codes.is_empty() {
            let codes: Vec<String> = self
                .status_codes
                .iter()
                .map(|(code, n)| format!("{} x{}", code, n))
                .collect();
            writeln!(f, "Status codes:   {}", codes.join(", "))?;
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for failure in &self.failures {
                writeln!(
                    f,
                    "  ✗ {} - {}: {}",
                    failure.test_id, failure.description, failure.message
                )?;
            }
        }
        write!(f, "{}", rule)
    }
}

/// Map serialized in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(std::marker::PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry()? {
                    entries.push((k, v));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(std::marker::PhantomData))
    }
}

/// `summary` section of the report document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    /// ISO-8601
    pub execution_time: String,
    pub test_environment: String,
    #[serde(default)]
    pub executor: String,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub avg_execution_time: f64,
}

/// `performance` section, response times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSection {
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub std_response_time: f64,
    pub threshold: f64,
    pub under_threshold: usize,
    pub samples: usize,
    #[serde(default)]
    pub fastest_test: Option<String>,
    #[serde(default)]
    pub slowest_test: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualResponse {
    /// Seconds
    pub response_time: Option<f64>,
    pub status_code: Option<u16>,
}

/// One entry of `test_results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub test_id: String,
    #[serde(default)]
    pub description: String,
    /// Absent in documents written by older runners
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    pub passed: bool,
    #[serde(default)]
    pub actual_response: ActualResponse,
    /// Seconds
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub result_message: String,
    #[serde(default)]
    pub timestamp: String,
}

impl ResultRecord {
    fn from_result(result: &TestResult) -> Self {
        Self {
            test_id: result.test_id.clone(),
            description: result.description.clone(),
            category: Some(result.category.to_string()),
            priority: Some(result.priority.to_string()),
            passed: result.passed,
            actual_response: ActualResponse {
                response_time: result.response_time.map(|t| t.as_secs_f64()),
                status_code: result.status_code,
            },
            execution_time: result.execution_time.as_secs_f64(),
            result_message: result.message.clone(),
            timestamp: result.timestamp.to_rfc3339(),
        }
    }

    /// Rebuild the result; unknown or missing category/priority are inferred from the id
    pub fn to_result(&self) -> TestResult {
        let category = self
            .category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_else(|| Category::from_test_id(&self.test_id));
        let priority = self
            .priority
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_else(|| Priority::from_test_id(&self.test_id));

        TestResult {
            test_id: self.test_id.clone(),
            description: self.description.clone(),
            category,
            priority,
            passed: self.passed,
            execution_time: secs(self.execution_time),
            response_time: self.actual_response.response_time.map(secs),
            status_code: self.actual_response.status_code,
            message: self.result_message.clone(),
            timestamp: parse_timestamp(&self.timestamp).unwrap_or_default(),
        }
    }
}

/// Non-positive and NaN map to zero, values beyond `Duration::MAX` saturate
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serialized report, the file format consumed by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub summary: SummarySection,
    #[serde(default)]
    pub categories: OrderedMap<Breakdown>,
    #[serde(default)]
    pub priorities: OrderedMap<Breakdown>,
    #[serde(default)]
    pub performance: Option<PerformanceSection>,
    #[serde(default)]
    pub status_codes: BTreeMap<String, usize>,
    pub test_results: Vec<ResultRecord>,
}

impl ReportDocument {
    /// Render an aggregated report together with the results it was built from
    pub fn from_report(report: &Report, results: &[TestResult]) -> Self {
        let performance = report.response.map(|stats| PerformanceSection {
            avg_response_time: stats.mean,
            min_response_time: stats.min,
            max_response_time: stats.max,
            std_response_time: stats.std_dev,
            threshold: report.threshold.as_secs_f64(),
            under_threshold: report.under_threshold,
            samples: stats.samples,
            fastest_test: report.fastest.as_ref().map(|c| c.test_id.clone()),
            slowest_test: report.slowest.as_ref().map(|c| c.test_id.clone()),
        });

        Self {
            summary: SummarySection {
                total_tests: report.total,
                passed: report.passed,
                failed: report.failed,
                pass_rate: report.pass_rate,
                execution_time: report.execution_time.to_rfc3339(),
                test_environment: report.environment.clone(),
                executor: report.executor.clone(),
                interrupted: report.interrupted,
                avg_execution_time: report.avg_execution_time,
            },
            categories: OrderedMap(
                report
                    .categories
                    .iter()
                    .map(|(c, b)| (c.to_string(), *b))
                    .collect(),
            ),
            priorities: OrderedMap(
                report
                    .priorities
                    .iter()
                    .map(|(p, b)| (p.to_string(), *b))
                    .collect(),
            ),
            performance,
            status_codes: report
                .status_codes
                .iter()
                .map(|(code, n)| (code.to_string(), *n))
                .collect(),
            test_results: results.iter().map(ResultRecord::from_result).collect(),
        }
    }

    /// Aggregate a run log and render it in one step
    pub fn from_run(log: &RunLog, threshold_secs: f64) -> (Report, Self) {
        let report = Report::aggregate(&log.results, &ReportOptions::from_run(log, threshold_secs));
        let document = Self::from_report(&report, &log.results);
        (report, document)
    }

    pub fn to_results(&self) -> Vec<TestResult> {
        self.test_results.iter().map(ResultRecord::to_result).collect()
    }

    /// Options reconstructed from the summary section
    pub fn options(&self) -> ReportOptions {
        let threshold = self
            .performance
            .as_ref()
            .map(|p| p.threshold)
            .unwrap_or(3.0);
        ReportOptions {
            performance_threshold: secs(threshold),
            environment: self.summary.test_environment.clone(),
            executor: self.summary.executor.clone(),
            interrupted: self.summary.interrupted,
            execution_time: parse_timestamp(&self.summary.execution_time).unwrap_or_default(),
        }
    }
}
