//! Harness configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::BrowserEngine;

/// Upper bound for every duration given in seconds
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Harness configuration, loaded from `regcheck.toml` when present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Registration target
    pub target: TargetConfig,

    /// Simulated executor configuration
    pub simulated: SimulatedConfig,

    /// HTTP executor configuration
    pub http: HttpConfig,

    /// Browser executor configuration
    pub browser: BrowserConfig,

    /// Report configuration
    pub report: ReportConfig,
}

/// Registration target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the site under test
    pub base_url: String,

    /// Path of the registration page / endpoint
    pub register_path: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5003".to_string(),
            register_path: "/register".to_string(),
        }
    }
}

impl TargetConfig {
    /// Full URL of the registration page / endpoint
    pub fn register_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.register_path.trim_start_matches('/')
        )
    }
}

/// Simulated executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Lower bound of the simulated response latency (seconds)
    pub latency_min_secs: f64,

    /// Upper bound of the simulated response latency (seconds)
    pub latency_max_secs: f64,

    /// RNG seed; a fresh seed is drawn per run when absent
    pub seed: Option<u64>,

    /// Actually sleep for the simulated latency
    pub realtime: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            latency_min_secs: 0.1,
            latency_max_secs: 2.0,
            seed: None,
            realtime: false,
        }
    }
}

/// HTTP executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Timeout of the connectivity probe run before the first case (seconds)
    pub probe_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            probe_timeout_secs: 5,
        }
    }
}

/// Browser executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser engine (chromium, firefox, webkit)
    pub engine: BrowserEngine,

    /// Run without a visible window
    pub headless: bool,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Bounded wait for form elements and response messages (milliseconds)
    pub element_timeout_ms: u64,

    /// Bounded wait for the driver to answer one case (milliseconds)
    pub case_timeout_ms: u64,

    /// Node.js binary used to run the driver script
    pub node_binary: String,

    /// CSS selectors keyed by form field or page element name
    pub selectors: BTreeMap<String, String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            element_timeout_ms: 15_000,
            case_timeout_ms: 60_000,
            node_binary: "node".to_string(),
            selectors: default_selectors(),
        }
    }
}

impl BrowserConfig {
    /// Selector for a field or element, if configured
    pub fn selector(&self, name: &str) -> Option<&str> {
        self.selectors.get(name).map(String::as_str)
    }
}

fn default_selectors() -> BTreeMap<String, String> {
    [
        ("form", "#registration-form"),
        ("username", "#username"),
        ("email", "#email"),
        ("password", "#password"),
        ("confirm_password", "#confirm_password"),
        ("first_name", "#first_name"),
        ("last_name", "#last_name"),
        ("phone", "#phone"),
        ("submit_button", "button[type='submit']"),
        ("error_message", ".error-message"),
        ("success_message", ".success-message"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory receiving `registration_test_report_<unix>.json`
    pub output_dir: PathBuf,

    /// Response times under this threshold count as compliant (seconds)
    pub performance_threshold_secs: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            performance_threshold_secs: 3.0,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            tracing::debug!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the executors cannot work with
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulated;
        check_seconds("simulated.latency_min_secs", sim.latency_min_secs)?;
        check_seconds("simulated.latency_max_secs", sim.latency_max_secs)?;
        if sim.latency_min_secs > sim.latency_max_secs {
            return Err(Error::InvalidConfig(format!(
                "simulated latency range must satisfy min <= max (got {}..{})",
                sim.latency_min_secs, sim.latency_max_secs
            )));
        }
        check_seconds(
            "report.performance_threshold_secs",
            self.report.performance_threshold_secs,
        )?;
        if self.target.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("target.base_url is empty".to_string()));
        }
        Ok(())
    }
}

/// Durations must be positive, finite and at most [`MAX_DURATION_SECS`]
fn check_seconds(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= MAX_DURATION_SECS {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{} must be in (0, {}] seconds (got {})",
            name, MAX_DURATION_SECS, value
        )))
    }
}
