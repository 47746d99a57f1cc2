//! HTTP executor: posts payloads to a live registration endpoint

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use regcheck_common::{ExecutionOutcome, HarnessConfig, Payload};

use crate::error::{E2eError, E2eResult};
use crate::executor::Executor;

pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
    register_url: String,
    probe_timeout: Duration,
}

impl HttpExecutor {
    pub fn new(config: &HarnessConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.target.base_url.clone(),
            register_url: config.target.register_url(),
            probe_timeout: Duration::from_secs(config.http.probe_timeout_secs),
        })
    }

    pub fn register_url(&self) -> &str {
        &self.register_url
    }
}

/// Pick the human-readable message out of a response body.
///
/// JSON bodies carry it in `error` (rejections) or `message` (success);
/// anything else is returned trimmed as-is.
pub fn extract_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        if let Some(errors) = value.get("errors").and_then(|v| v.as_array()) {
            let joined: Vec<&str> = errors.iter().filter_map(|e| e.as_str()).collect();
            if !joined.is_empty() {
                return Some(joined.join("; "));
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn name(&self) -> &str {
        "http"
    }

    fn environment(&self) -> String {
        self.base_url.clone()
    }

    /// Connectivity probe; any HTTP response counts as reachable
    async fn acquire(&mut self) -> E2eResult<()> {
        let probe = self
            .client
            .get(&self.base_url)
            .timeout(self.probe_timeout)
            .send()
            .await;

        match probe {
            Ok(resp) => {
                info!("Target {} reachable ({})", self.base_url, resp.status());
                Ok(())
            }
            Err(e) => {
                warn!("Connectivity probe failed: {}", e);
                Err(E2eError::setup(
                    "http",
                    format!("cannot reach {}: {}", self.base_url, e),
                ))
            }
        }
    }

    async fn execute(&mut self, payload: &Payload) -> E2eResult<ExecutionOutcome> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.register_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    E2eError::Timeout(format!("POST {}", self.register_url))
                } else {
                    E2eError::Http(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        let elapsed = start.elapsed();
        debug!("POST {} -> {} in {:?}", self.register_url, status, elapsed);

        Ok(ExecutionOutcome {
            success: status.is_success(),
            status_code: Some(status.as_u16()),
            message: extract_message(&body),
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn executor_for(base_url: String) -> HttpExecutor {
        let mut config = HarnessConfig::default();
        config.target.base_url = base_url;
        config.http.probe_timeout_secs = 2;
        config.http.request_timeout_secs = 5;
        HttpExecutor::new(&config).unwrap()
    }

    /// Read one request, headers plus `Content-Length` bytes of body
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        line.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serve a single canned response, returning the base URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreachable_target_is_setup_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut executor = executor_for(format!("http://127.0.0.1:{}", port));
        let err = executor.acquire().await.unwrap_err();
        assert!(err.is_setup());
    }

    #[tokio::test]
    async fn test_any_response_counts_as_reachable() {
        let base = serve_once("404 Not Found", "{}").await;
        let mut executor = executor_for(base);
        executor.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_keeps_status_and_message() {
        let base = serve_once("400 Bad Request", r#"{"error":"Email is required"}"#).await;
        let mut executor = executor_for(base);
        let outcome = executor
            .execute(&Payload::new().with("username", "validuser"))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(400));
        assert_eq!(outcome.message.as_deref(), Some("Email is required"));
    }

    #[tokio::test]
    async fn test_created_is_success() {
        let base = serve_once("201 Created", r#"{"message":"Registration successful"}"#).await;
        let mut executor = executor_for(base);
        let outcome = executor.execute(&Payload::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.status_code, Some(201));
        assert_eq!(outcome.message.as_deref(), Some("Registration successful"));
    }

    #[test]
    fn test_extract_error_field() {
        assert_eq!(
            extract_message(r#"{"error": "Username is required"}"#).as_deref(),
            Some("Username is required")
        );
    }

    #[test]
    fn test_extract_message_field() {
        assert_eq!(
            extract_message(r#"{"message": "Registration successful", "user_id": 4242}"#)
                .as_deref(),
            Some("Registration successful")
        );
    }

    #[test]
    fn test_extract_error_list() {
        assert_eq!(
            extract_message(r#"{"errors": ["Email is required", "Password is required"]}"#)
                .as_deref(),
            Some("Email is required; Password is required")
        );
    }

    #[test]
    fn test_extract_plain_body() {
        assert_eq!(extract_message("  Bad Request \n").as_deref(), Some("Bad Request"));
        assert_eq!(extract_message("   "), None);
    }

    #[test]
    fn test_register_url_from_config() {
        let mut config = HarnessConfig::default();
        config.target.base_url = "http://127.0.0.1:9/".to_string();
        let executor = HttpExecutor::new(&config).unwrap();
        assert_eq!(executor.register_url(), "http://127.0.0.1:9/register");
    }
}
