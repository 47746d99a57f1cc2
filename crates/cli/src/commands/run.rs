//! Run Command

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::warn;

use regcheck_common::{BrowserEngine, Category, HarnessConfig, Priority};
use regcheck_e2e::artifact::write_report;
use regcheck_e2e::{build_executor, CaseFilter, Catalog, ExecutorKind, ReportDocument, TestRunner};

use crate::output::{print_success, print_warning, render_structured, OutputFormat};

/// Executor selectable on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExecutorArg {
    /// In-process validation rules, no network
    #[default]
    Simulated,
    /// POST payloads to <url>/register
    Http,
    /// Drive the registration page with Playwright
    Browser,
}

impl From<ExecutorArg> for ExecutorKind {
    fn from(arg: ExecutorArg) -> Self {
        match arg {
            ExecutorArg::Simulated => ExecutorKind::Simulated,
            ExecutorArg::Http => ExecutorKind::Http,
            ExecutorArg::Browser => ExecutorKind::Browser,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Executor used to submit payloads
    #[arg(short, long, value_enum, default_value_t = ExecutorArg::Simulated)]
    pub executor: ExecutorArg,

    /// Base URL of the site under test
    #[arg(long, env = "REGCHECK_URL")]
    pub url: Option<String>,

    /// Run the browser without a window (true/false)
    #[arg(long)]
    pub headless: Option<bool>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<BrowserEngine>,

    /// Only run cases of this category
    #[arg(long)]
    pub category: Option<Category>,

    /// Only run cases of this priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Only run cases whose id starts with this prefix
    #[arg(long)]
    pub id: Option<String>,

    /// YAML catalog file or directory instead of the built-in suite
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Seed for simulated latency
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sleep for simulated latency
    #[arg(long)]
    pub realtime: bool,

    /// Directory receiving the JSON report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Performance threshold in seconds
    #[arg(long)]
    pub threshold: Option<f64>,
}

impl RunArgs {
    /// Command-line values override the configuration file
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(url) = &self.url {
            config.target.base_url = url.clone();
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(engine) = self.browser {
            config.browser.engine = engine;
        }
        if let Some(seed) = self.seed {
            config.simulated.seed = Some(seed);
        }
        if self.realtime {
            config.simulated.realtime = true;
        }
        if let Some(dir) = &self.output {
            config.report.output_dir = dir.clone();
        }
        if let Some(threshold) = self.threshold {
            config.report.performance_threshold_secs = threshold;
        }
    }

    pub fn filter(&self) -> CaseFilter {
        CaseFilter {
            category: self.category,
            priority: self.priority,
            id_prefix: self.id.clone(),
        }
    }
}

/// Built-in suite, or YAML definitions from a file or directory
pub fn load_catalog(source: Option<&Path>) -> Result<Catalog> {
    Ok(match source {
        Some(path) if path.is_dir() => Catalog::load_dir(path)
            .with_context(|| format!("loading catalog directory {}", path.display()))?,
        Some(path) => Catalog::from_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::registration(chrono::Utc::now().timestamp())?,
    })
}

pub async fn execute(args: RunArgs, mut config: HarnessConfig, format: OutputFormat) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let catalog = load_catalog(args.catalog.as_deref())?.filtered(&args.filter());
    if catalog.is_empty() {
        print_warning("No test cases match the given filters");
    }

    let kind = ExecutorKind::from(args.executor);
    let mut executor = build_executor(kind, &config)?;

    let runner = TestRunner::new();
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping the run");
            cancel.cancel();
        }
    });

    let progress = ProgressBar::new(catalog.len() as u64);
    if format.is_structured() {
        progress.set_draw_target(ProgressDrawTarget::hidden());
    }
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let run = runner
        .run_observed(&catalog, executor.as_mut(), |result| {
            if !result.passed {
                progress.println(format!(
                    "{} {} - {}",
                    "✗".red(),
                    result.test_id,
                    result.message
                ));
            }
            progress.set_message(result.test_id.clone());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();

    // Setup failure: nothing ran, no report
    let log = run?;

    let (report, document) =
        ReportDocument::from_run(&log, config.report.performance_threshold_secs);

    if format.is_structured() {
        println!("{}", render_structured(&document, format)?);
    } else {
        println!("{}", report.render_text());
        let verdict = format!(
            "{}/{} passed ({:.1}%)",
            report.passed, report.total, report.pass_rate
        );
        if report.failed == 0 {
            println!("{}", verdict.green().bold());
        } else {
            println!("{}", verdict.yellow().bold());
        }
    }

    let path = write_report(&config.report.output_dir, &document)
        .with_context(|| format!("writing report to {}", config.report.output_dir.display()))?;

    if !format.is_structured() {
        print_success(&format!("Report saved: {}", path.display()));
    }
    if log.interrupted {
        print_warning(&format!(
            "Run interrupted after {} of {} case(s)",
            log.results.len(),
            catalog.len()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = RunArgs {
            url: Some("http://staging:8080".to_string()),
            headless: Some(false),
            seed: Some(5),
            output: Some(PathBuf::from("reports")),
            ..Default::default()
        };
        let mut config = HarnessConfig::default();
        args.apply(&mut config);
        assert_eq!(config.target.base_url, "http://staging:8080");
        assert!(!config.browser.headless);
        assert_eq!(config.simulated.seed, Some(5));
        assert_eq!(config.report.output_dir, PathBuf::from("reports"));
        assert!(!config.simulated.realtime);
    }

    #[test]
    fn test_infinite_threshold_rejected_after_overrides() {
        let args = RunArgs {
            threshold: Some(f64::INFINITY),
            browser: Some(BrowserEngine::Webkit),
            ..Default::default()
        };
        let mut config = HarnessConfig::default();
        args.apply(&mut config);
        assert_eq!(config.browser.engine, BrowserEngine::Webkit);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_from_args() {
        let args = RunArgs {
            category: Some(Category::Security),
            id: Some("REG_015".to_string()),
            ..Default::default()
        };
        let catalog = load_catalog(None).unwrap().filtered(&args.filter());
        assert_eq!(catalog.len(), 4);
    }
}
