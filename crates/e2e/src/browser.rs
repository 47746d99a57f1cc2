//! Browser executor backed by a long-lived Playwright driver
//!
//! A generated Node.js script launches one browser for the whole run and
//! answers one JSON line per registration attempt on stdout. Every attempt
//! carries a sequence number the driver echoes back, so a reply that arrives
//! after its case timed out is discarded instead of being read as the answer
//! to the next case. The session is opened by [`Executor::acquire`] and closed
//! by [`Executor::release`]; the child process is also killed on drop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use regcheck_common::{ExecutionOutcome, HarnessConfig, Payload};

use crate::error::{E2eError, E2eResult};
use crate::executor::Executor;

/// Settings embedded into the driver script
#[derive(Debug, Clone, Serialize)]
pub struct DriverConfig {
    pub browser: &'static str,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub register_url: String,
    pub form_selector: String,
    pub submit_selector: String,
    pub success_selector: String,
    pub error_selector: String,
    pub element_timeout_ms: u64,
}

/// One field to fill, already resolved to its selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFill {
    pub field: String,
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Register { seq: u64, fields: &'a [FieldFill] },
    Close,
}

/// A line written by the driver
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverReply {
    /// Echo of the command's sequence number; absent on the ready line
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// "timeout", "element_not_found" or "driver"
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub elapsed_ms: f64,
}

impl DriverReply {
    /// Convert a reply to a registration command into an outcome or an error
    pub fn into_outcome(self) -> E2eResult<ExecutionOutcome> {
        if !self.ok {
            let reason = self.error.unwrap_or_else(|| "unknown driver error".to_string());
            return Err(match self.kind.as_deref() {
                Some("timeout") => E2eError::Timeout(reason),
                Some("element_not_found") => E2eError::ElementNotFound(reason),
                _ => E2eError::Playwright(reason),
            });
        }
        Ok(ExecutionOutcome {
            success: self.success,
            status_code: None,
            message: self.message,
            elapsed: Duration::from_secs_f64(self.elapsed_ms.max(0.0) / 1000.0),
        })
    }
}

struct DriverSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    // Keeps the script file alive for the lifetime of the process
    _script_dir: Option<tempfile::TempDir>,
}

impl DriverSession {
    fn spawn(mut command: Command, script_dir: Option<tempfile::TempDir>) -> E2eResult<Self> {
        let program = command.as_std().get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Playwright(format!("failed to spawn {}: {}", program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[driver] {}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            _script_dir: script_dir,
        })
    }

    /// Wait for the ready line; the session is shut down if it never comes
    async fn wait_ready(mut self, timeout: Duration) -> E2eResult<Self> {
        match self.receive(None, timeout, "browser launch").await {
            Ok(reply) if reply.ready => Ok(self),
            Ok(reply) => {
                let reason = reply
                    .error
                    .unwrap_or_else(|| "driver did not report ready".to_string());
                self.shutdown().await;
                Err(E2eError::Playwright(reason))
            }
            Err(e) => {
                self.shutdown().await;
                Err(e)
            }
        }
    }

    async fn send(&mut self, command: &DriverCommand<'_>) -> E2eResult<()> {
        let mut line = serde_json::to_string(command)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Next reply tagged with `seq`, within one deadline for the whole wait
    async fn receive(
        &mut self,
        seq: Option<u64>,
        timeout: Duration,
        waiting_for: &str,
    ) -> E2eResult<DriverReply> {
        let deadline = Instant::now() + timeout;
        loop {
            let line = tokio::time::timeout_at(deadline, self.stdout.next_line())
                .await
                .map_err(|_| E2eError::Timeout(waiting_for.to_string()))??;

            let Some(line) = line else {
                return Err(E2eError::Playwright("driver process exited".to_string()));
            };

            // Anything that is not a JSON object is console noise from the page
            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) if reply.seq == seq => return Ok(reply),
                Ok(reply) => debug!(
                    "Discarding stale driver reply (seq {:?}, waiting for {:?})",
                    reply.seq, seq
                ),
                Err(_) => debug!("[driver] {}", line),
            }
        }
    }

    /// Ask the driver to close the browser, then make sure the process is gone
    async fn shutdown(mut self) {
        if self.send(&DriverCommand::Close).await.is_ok() {
            if let Ok(Ok(status)) =
                tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await
            {
                debug!("Playwright driver exited with {}", status);
                return;
            }
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    if tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                        .await
                        .is_ok()
                    {
                        return;
                    }
                }
            }
        }

        // Force kill if still running
        let _ = self.child.kill().await;
    }
}

/// Executor that fills and submits the registration form in a real browser
pub struct BrowserExecutor {
    driver: DriverConfig,
    selectors: std::collections::BTreeMap<String, String>,
    node_binary: String,
    case_timeout: Duration,
    base_url: String,
    next_seq: u64,
    session: Option<DriverSession>,
}

impl BrowserExecutor {
    pub fn new(config: &HarnessConfig) -> Self {
        let browser = &config.browser;
        let selector = |name: &str, fallback: &str| {
            browser.selector(name).unwrap_or(fallback).to_string()
        };

        Self {
            driver: DriverConfig {
                browser: browser.engine.as_str(),
                headless: browser.headless,
                viewport_width: browser.viewport_width,
                viewport_height: browser.viewport_height,
                register_url: config.target.register_url(),
                form_selector: selector("form", "form"),
                submit_selector: selector("submit_button", "button[type='submit']"),
                success_selector: selector("success_message", ".success-message"),
                error_selector: selector("error_message", ".error-message"),
                element_timeout_ms: browser.element_timeout_ms,
            },
            selectors: browser.selectors.clone(),
            node_binary: browser.node_binary.clone(),
            case_timeout: Duration::from_millis(browser.case_timeout_ms),
            base_url: config.target.base_url.clone(),
            next_seq: 0,
            session: None,
        }
    }

    /// Resolve payload fields to selectors; fields without one are not on the form
    pub fn field_fills(&self, payload: &Payload) -> Vec<FieldFill> {
        payload
            .iter()
            .filter_map(|(field, value)| match self.selectors.get(field) {
                Some(selector) => Some(FieldFill {
                    field: field.to_string(),
                    selector: selector.clone(),
                    value: value.to_string(),
                }),
                None => {
                    debug!("No selector for field '{}', skipping", field);
                    None
                }
            })
            .collect()
    }

    pub fn driver_script(&self) -> E2eResult<String> {
        build_driver_script(&self.driver)
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn open_session(&mut self) -> E2eResult<DriverSession> {
        Self::check_playwright_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("registration-driver.js");
        std::fs::write(&script_path, self.driver_script()?)?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut command = Command::new(&self.node_binary);
        command.arg(&script_path);
        DriverSession::spawn(command, Some(script_dir))?
            .wait_ready(self.case_timeout)
            .await
    }
}

#[async_trait]
impl Executor for BrowserExecutor {
    fn name(&self) -> &str {
        "browser"
    }

    fn environment(&self) -> String {
        self.base_url.clone()
    }

    async fn acquire(&mut self) -> E2eResult<()> {
        if self.session.is_some() {
            return Ok(()); // Already running
        }

        let session = self
            .open_session()
            .await
            .map_err(|e| E2eError::setup("browser", e))?;

        info!(
            "{} session ready (headless: {})",
            self.driver.browser, self.driver.headless
        );
        self.session = Some(session);
        Ok(())
    }

    async fn execute(&mut self, payload: &Payload) -> E2eResult<ExecutionOutcome> {
        let fields = self.field_fills(payload);
        let timeout = self.case_timeout;
        self.next_seq += 1;
        let seq = self.next_seq;
        let session = self.session.as_mut().ok_or(E2eError::SessionClosed)?;

        session.send(&DriverCommand::Register { seq, fields: &fields }).await?;
        session
            .receive(Some(seq), timeout, "registration response")
            .await?
            .into_outcome()
    }

    async fn release(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
            info!("Browser session closed");
        }
    }
}

/// Generate the Node.js driver script for the given settings
pub fn build_driver_script(config: &DriverConfig) -> E2eResult<String> {
    let config_json = serde_json::to_string(config)?;
    Ok(format!(
        r#"
const playwright = require('playwright');
const readline = require('readline');

const CONFIG = {config_json};

function reply(obj) {{
  process.stdout.write(JSON.stringify(obj) + '\n');
}}

async function visibleText(page, selector) {{
  const locator = page.locator(selector).first();
  if ((await locator.count()) === 0) return null;
  if (!(await locator.isVisible())) return null;
  const text = (await locator.innerText()).trim();
  return text.length > 0 ? text : null;
}}

async function register(page, fields) {{
  const started = Date.now();
  await page.goto(CONFIG.register_url);
  try {{
    await page.waitForSelector(CONFIG.form_selector, {{ timeout: CONFIG.element_timeout_ms }});
  }} catch (e) {{
    return {{ ok: false, kind: 'element_not_found', error: 'form ' + CONFIG.form_selector + ' not found' }};
  }}

  for (const f of fields) {{
    const locator = page.locator(f.selector).first();
    try {{
      await locator.waitFor({{ state: 'visible', timeout: CONFIG.element_timeout_ms }});
    }} catch (e) {{
      return {{ ok: false, kind: 'element_not_found', error: 'field ' + f.field + ' (' + f.selector + ') not found' }};
    }}
    await locator.fill(f.value);
  }}

  try {{
    await page.locator(CONFIG.submit_selector).first().click({{ timeout: CONFIG.element_timeout_ms }});
  }} catch (e) {{
    return {{ ok: false, kind: 'element_not_found', error: 'submit button ' + CONFIG.submit_selector + ' not found' }};
  }}

  const either = CONFIG.success_selector + ', ' + CONFIG.error_selector;
  try {{
    await page.waitForSelector(either, {{ state: 'visible', timeout: CONFIG.element_timeout_ms }});
  }} catch (e) {{
    return {{ ok: false, kind: 'timeout', error: 'no success or error message after submit' }};
  }}

  const success = await visibleText(page, CONFIG.success_selector);
  const error = await visibleText(page, CONFIG.error_selector);
  const elapsed_ms = Date.now() - started;
  if (success !== null) return {{ ok: true, success: true, message: success, elapsed_ms }};
  return {{ ok: true, success: false, message: error, elapsed_ms }};
}}

(async () => {{
  let browser;
  try {{
    browser = await playwright[CONFIG.browser].launch({{ headless: CONFIG.headless }});
  }} catch (e) {{
    reply({{ ready: false, error: 'browser launch failed: ' + e.message }});
    process.exit(1);
  }}
  const context = await browser.newContext({{
    viewport: {{ width: CONFIG.viewport_width, height: CONFIG.viewport_height }}
  }});
  const page = await context.newPage();
  reply({{ ready: true }});

  const rl = readline.createInterface({{ input: process.stdin }});
  for await (const line of rl) {{
    let cmd;
    try {{
      cmd = JSON.parse(line);
    }} catch (e) {{
      reply({{ ok: false, kind: 'driver', error: 'bad command: ' + e.message }});
      continue;
    }}
    if (cmd.cmd === 'close') break;
    try {{
      reply({{ seq: cmd.seq, ...(await register(page, cmd.fields || [])) }});
    }} catch (e) {{
      const kind = e && e.name === 'TimeoutError' ? 'timeout' : 'driver';
      reply({{ seq: cmd.seq, ok: false, kind, error: e.message }});
    }}
  }}

  await browser.close();
  process.exit(0);
}})();
"#
    ))
}
