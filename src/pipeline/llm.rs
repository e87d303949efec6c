//! Completion API client and the rate-limit backoff loop.
//!
//! The prompt goes out as a single user message to an OpenAI-compatible
//! `/chat/completions` endpoint (Groq by default). All prompt text lives in
//! [`crate::prompts`]; this module only moves it over the wire and decides
//! whether a failure is worth another attempt.
//!
//! ## Retry Strategy
//!
//! Only rate-limit answers (HTTP 429 or error code `rate_limit_exceeded`)
//! are retried. With the defaults of 3 attempts and a 1000 ms base the waits
//! are 1 s then 2 s; any other failure ends the loop at once. Waiting goes
//! through the [`Sleeper`] trait so tests can run the loop without a clock.

use crate::config::ScrapeConfig;
use crate::error::{CompletionError, ScrapeError};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Error code the completion API uses for rate limiting.
pub const RATE_LIMIT_CODE: &str = "rate_limit_exceeded";

/// One round trip to a completion service.
///
/// An answer without content is `Ok("")`; rejecting it is the caller's job.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Groq client ──────────────────────────────────────────────────────────

/// [`CompletionClient`] for Groq or any OpenAI-compatible endpoint.
pub struct GroqClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl GroqClient {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .timeout(config.api_timeout())
            .build()
            .map_err(|e| ScrapeError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!("POST {} ({} prompt chars)", self.endpoint, prompt.chars().count());
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = resp
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text, retry_after));
        }

        parse_content(&text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Content of the first choice, or `""` when the answer carries none.
pub fn parse_content(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode(e.to_string()))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

/// Turn a non-success answer into a [`CompletionError`].
///
/// HTTP 429 and the `rate_limit_exceeded` code both count as rate limiting,
/// whatever the other one says.
pub fn classify_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> CompletionError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = envelope.as_ref().and_then(|e| e.error.code.clone());
    let message = envelope
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });

    if status == 429 || code.as_deref() == Some(RATE_LIMIT_CODE) {
        CompletionError::RateLimited {
            message,
            retry_after_secs,
        }
    } else {
        CompletionError::Api {
            status,
            code,
            message,
        }
    }
}

// ── Backoff ──────────────────────────────────────────────────────────────

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to call the API and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Wait after the `failed_attempt`-th rate-limited attempt (1-indexed).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    /// Attempts used, 1 when the first call succeeded.
    pub attempts: u32,
}

/// Call `client`, retrying rate-limit failures per `policy`.
///
/// Any other failure becomes [`ScrapeError::Model`] immediately. After
/// `max_attempts` rate-limited calls the result is
/// [`ScrapeError::RateLimitExhausted`] and no further call is made.
pub async fn complete_with_backoff(
    client: &dyn CompletionClient,
    prompt: &str,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    progress: Option<&ProgressCallback>,
) -> Result<Completion, ScrapeError> {
    let mut last_err: Option<String> = None;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let backoff = policy.delay_for(attempt - 1);
            warn!(
                "Rate limited by {}; retry {}/{} after {}ms",
                client.model(),
                attempt,
                policy.max_attempts,
                backoff.as_millis()
            );
            if let Some(cb) = progress {
                cb.on_retry(attempt - 1, backoff.as_millis() as u64);
            }
            sleeper.sleep(backoff).await;
        }

        match client.complete(prompt).await {
            Ok(content) => {
                debug!(
                    "Completion from {}: {} chars after {} attempt(s)",
                    client.model(),
                    content.chars().count(),
                    attempt
                );
                return Ok(Completion {
                    content,
                    attempts: attempt,
                });
            }
            Err(e) if e.is_rate_limited() => {
                match e.retry_after_secs() {
                    Some(secs) => warn!(
                        "Attempt {} rate limited (server asks for {}s): {}",
                        attempt, secs, e
                    ),
                    None => warn!("Attempt {} rate limited: {}", attempt, e),
                }
                last_err = Some(e.to_string());
            }
            Err(e) => {
                return Err(ScrapeError::Model {
                    message: e.to_string(),
                });
            }
        }
    }

    Err(ScrapeError::RateLimitExhausted {
        attempts: policy.max_attempts,
        message: last_err.unwrap_or_else(|| "rate limit exceeded".to_string()),
    })
}
