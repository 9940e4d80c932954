/// Judge Submission Manager - Remote Execution Backend
///
/// **Core Responsibility:**
/// Submit a synthesized program to the remote judge, poll until it reaches a
/// terminal status, and return the decoded result.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to reach the judge (HTTP, credentials, polling)
/// - Engine does NOT evaluate correctness
/// - Engine returns raw judge results for the Evaluator to judge
///
/// **Credential failover (per submission):**
/// Credentials are tried in list order, starting from the first on every
/// call. A 429 or any other submit failure moves to the next credential; the
/// last credential's failure decides the error. A 429 while polling aborts at
/// once, since the token belongs to the credential that created it.

use arbiter_common::config::{Credential, JudgeConfig};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{header::RETRY_AFTER, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Judge status ids below this are still queued or processing
pub const FIRST_TERMINAL_STATUS: u32 = 3;

/// The only status the Evaluator compares output for
pub const STATUS_ACCEPTED: u32 = 3;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// Every credential was rate limited, or polling hit a 429
    #[error("judge rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// Every credential failed for a reason other than rate limiting
    #[error("judge submission failed: {0}")]
    SubmissionFailed(String),

    #[error("judge result not ready after {attempts} polls")]
    PollTimeout { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: u32,
    pub description: String,
}

/// Decoded result of one judged program
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeResult {
    pub token: String,
    pub status: JudgeStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    /// Seconds
    pub time: Option<f64>,
    /// Kilobytes
    pub memory: Option<u64>,
}

impl JudgeResult {
    pub fn is_accepted(&self) -> bool {
        self.status.id == STATUS_ACCEPTED
    }

    /// Most specific diagnostic the judge returned, if any
    pub fn diagnostic(&self) -> Option<&str> {
        [&self.compile_output, &self.stderr, &self.message]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Remote execution seam
///
/// Production uses `Judge0Engine`; tests drive the orchestrator with a
/// scripted backend.
#[async_trait]
pub trait JudgeBackend: Send + Sync {
    async fn execute(&self, program: &str, language_id: u32) -> Result<JudgeResult, JudgeError>;
}

/// Wire shape of a submission as the judge returns it
#[derive(Debug, Deserialize)]
struct WireSubmission {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    status: Option<JudgeStatus>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
    #[serde(default)]
    message: Option<String>,
    // The judge reports time as a string ("0.012") and memory as a number
    #[serde(default)]
    time: Option<Value>,
    #[serde(default)]
    memory: Option<Value>,
}

fn flexible_number(value: &Option<Value>) -> Option<f64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a base64 field; undecodable content is kept as-is
fn decode_field(field: Option<String>) -> Option<String> {
    let raw = field?;
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match general_purpose::STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => Some(raw),
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Outcome of one submit attempt with one credential
enum SubmitFailure {
    RateLimited(Option<Duration>),
    Other(String),
}

/// Judge0-compatible HTTP client
pub struct Judge0Engine {
    client: reqwest::Client,
    base_url: String,
    credentials: Vec<Credential>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl Judge0Engine {
    pub fn new(config: &JudgeConfig) -> anyhow::Result<Self> {
        if config.credentials.is_empty() {
            anyhow::bail!("at least one judge credential is required");
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!(
            base_url = %config.base_url,
            credentials = config.credentials.len(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            max_poll_attempts = config.max_poll_attempts,
            "Judge engine initialized"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder, credential: &Credential) -> reqwest::RequestBuilder {
        let request = request.header("X-RapidAPI-Key", &credential.key);
        match &credential.host {
            Some(host) => request.header("X-RapidAPI-Host", host),
            None => request,
        }
    }

    async fn submit(
        &self,
        credential: &Credential,
        program: &str,
        language_id: u32,
    ) -> Result<String, SubmitFailure> {
        let url = format!("{}/submissions?base64_encoded=true&wait=false", self.base_url);
        let body = json!({
            "language_id": language_id,
            "source_code": general_purpose::STANDARD.encode(program.as_bytes()),
            "stdin": "",
        });

        let response = self
            .authorize(self.client.post(&url), credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmitFailure::Other(format!("request error: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SubmitFailure::RateLimited(retry_after(&response)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SubmitFailure::Other(format!("HTTP {status}: {}", text.trim())));
        }

        let wire: WireSubmission = response
            .json()
            .await
            .map_err(|e| SubmitFailure::Other(format!("undecodable submit response: {e}")))?;

        wire.token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SubmitFailure::Other("submit response carried no token".to_string()))
    }

    async fn poll(&self, credential: &Credential, token: &str) -> Result<JudgeResult, JudgeError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=true&fields=*",
            self.base_url, token
        );

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = match self.authorize(self.client.get(&url), credential).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(token, attempt, error = %e, "Poll request failed");
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(token, attempt, "Rate limited while polling");
                return Err(JudgeError::RateLimitExceeded {
                    retry_after: retry_after(&response),
                });
            }
            if !status.is_success() {
                warn!(token, attempt, http_status = %status, "Poll returned error status");
                continue;
            }

            let wire: WireSubmission = match response.json().await {
                Ok(wire) => wire,
                Err(e) => {
                    warn!(token, attempt, error = %e, "Undecodable poll response");
                    continue;
                }
            };

            let Some(judge_status) = wire.status.clone() else {
                warn!(token, attempt, "Poll response carried no status");
                continue;
            };
            if judge_status.id < FIRST_TERMINAL_STATUS {
                debug!(token, attempt, status = %judge_status.description, "Still running");
                continue;
            }

            return Ok(JudgeResult {
                token: token.to_string(),
                status: judge_status,
                time: flexible_number(&wire.time),
                memory: flexible_number(&wire.memory).map(|m| m as u64),
                stdout: decode_field(wire.stdout),
                stderr: decode_field(wire.stderr),
                compile_output: decode_field(wire.compile_output),
                message: decode_field(wire.message),
            });
        }

        Err(JudgeError::PollTimeout {
            attempts: self.max_poll_attempts,
        })
    }
}

#[async_trait]
impl JudgeBackend for Judge0Engine {
    #[instrument(skip(self, program), fields(program_bytes = program.len()))]
    async fn execute(&self, program: &str, language_id: u32) -> Result<JudgeResult, JudgeError> {
        let last = self.credentials.len().saturating_sub(1);

        for (index, credential) in self.credentials.iter().enumerate() {
            match self.submit(credential, program, language_id).await {
                Ok(token) => {
                    debug!(credential_index = index, token = %token, "Submission accepted");
                    return self.poll(credential, &token).await;
                }
                Err(SubmitFailure::RateLimited(retry_after)) => {
                    if index == last {
                        warn!(credential_index = index, "All judge credentials rate limited");
                        return Err(JudgeError::RateLimitExceeded { retry_after });
                    }
                    warn!(credential_index = index, "Judge credential rate limited, failing over");
                }
                Err(SubmitFailure::Other(reason)) => {
                    if index == last {
                        return Err(JudgeError::SubmissionFailed(reason));
                    }
                    warn!(credential_index = index, reason = %reason, "Judge submission failed, failing over");
                }
            }
        }

        Err(JudgeError::SubmissionFailed(
            "no judge credentials configured".to_string(),
        ))
    }
}
