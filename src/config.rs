//! Configuration types for the scrape pipeline.
//!
//! Every knob lives in [`ScrapeConfig`], built via its [`ScrapeConfigBuilder`].
//! The config is read-only once built: the server shares one instance across
//! all requests behind an `Arc`.

use crate::error::ScrapeError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Desktop Chrome identification sent by the renderer.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Configuration for a scrape.
///
/// # Example
/// ```rust
/// use pagesift::ScrapeConfig;
///
/// let config = ScrapeConfig::builder()
///     .api_key("gsk_test")
///     .max_prompt_chars(2000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Clone)]
pub struct ScrapeConfig {
    /// Bearer credential for the completion API. Required, no default.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    pub api_base: String,

    /// Completion model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Characters of page text embedded in the prompt. Default: 3000.
    ///
    /// Pattern extraction always sees the full text; only the prompt is cut.
    pub max_prompt_chars: usize,

    /// Total completion attempts when the API rate limits us. Default: 3.
    pub max_attempts: u32,

    /// Delay before the second attempt, doubled for each later one. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Hard bound on launching, navigating and serialising a page. Default: 120.
    pub render_timeout_secs: u64,

    /// Per-request timeout for the completion API. Default: 60.
    pub api_timeout_secs: u64,

    /// User agent presented by the headless browser.
    pub user_agent: String,

    /// Explicit Chrome/Chromium binary. `None` lets chromiumoxide search.
    pub chrome_executable: Option<PathBuf>,

    /// Language of the prompt template and the user-facing error messages.
    pub locale: Locale,

    /// Optional observer for stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_prompt_chars: 3000,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            render_timeout_secs: 120,
            api_timeout_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_executable: None,
            locale: Locale::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ScrapeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field("locale", &self.locale)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ScrapeProgressCallback>"),
            )
            .finish()
    }
}

impl ScrapeConfig {
    /// Create a new builder for `ScrapeConfig`.
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

/// Builder for [`ScrapeConfig`].
#[derive(Debug)]
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl ScrapeConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.config.locale = locale;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScrapeConfig, ScrapeError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(ScrapeError::InvalidConfig(
                "an API key for the completion service is required (set GROQ_API_KEY)".into(),
            ));
        }
        if !c.api_base.starts_with("http://") && !c.api_base.starts_with("https://") {
            return Err(ScrapeError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ScrapeError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_prompt_chars < 100 {
            return Err(ScrapeError::InvalidConfig(format!(
                "max prompt characters must be ≥ 100, got {}",
                c.max_prompt_chars
            )));
        }
        if c.max_attempts == 0 {
            return Err(ScrapeError::InvalidConfig("max attempts must be ≥ 1".into()));
        }
        if c.render_timeout_secs == 0 {
            return Err(ScrapeError::InvalidConfig(
                "render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ScrapeError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Language used for the prompt template and user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English (default).
    #[default]
    English,
    /// Greek.
    Greek,
}

impl FromStr for Locale {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "el" | "gr" | "greek" => Ok(Locale::Greek),
            other => Err(ScrapeError::InvalidConfig(format!(
                "unknown locale '{other}' (expected en or el)"
            ))),
        }
    }
}
