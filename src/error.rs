//! Error types for the pagesift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ScrapeError`] — **Fatal**: the request cannot produce a response
//!   (no URL, the page did not render, the model answer was unusable).
//!   Returned as `Err(ScrapeError)` from [`crate::scrape::Scraper`].
//!
//! * [`CompletionError`] — **Per attempt**: a single call to the completion
//!   API failed. Rate-limit failures are retried by
//!   [`crate::pipeline::llm::complete_with_backoff`]; everything else is
//!   promoted to a [`ScrapeError`] immediately.
//!
//! Callers facing end users never show a `ScrapeError`'s `Display` text.
//! They map it to an [`ErrorKind`] and show the canonical message for the
//! configured [`Locale`] instead; the detailed text goes to the log.

use crate::config::Locale;
use thiserror::Error;

/// All fatal errors returned by the scrape pipeline.
#[derive(Debug, Error)]
pub enum ScrapeError {
    // ── Request errors ───────────────────────────────────────────────────
    /// The request carried no URL (or only whitespace).
    #[error("URL is required")]
    MissingUrl,

    // ── Render errors ────────────────────────────────────────────────────
    /// The headless browser could not be started.
    #[error("Failed to launch headless browser: {detail}")]
    BrowserLaunch { detail: String },

    /// The browser started but the page did not load.
    #[error("Navigation to '{url}' failed: {detail}")]
    Navigation { url: String, detail: String },

    /// The page did not reach a parsed DOM within the render bound.
    #[error("Rendering '{url}' timed out after {secs}s")]
    RenderTimeout { url: String, secs: u64 },

    // ── Model errors ─────────────────────────────────────────────────────
    /// Every attempt was answered with a rate-limit error.
    #[error("Completion API still rate limited after {attempts} attempts: {message}")]
    RateLimitExhausted { attempts: u32, message: String },

    /// The completion API returned a non-retryable error.
    #[error("Completion API error: {message}")]
    Model { message: String },

    /// The completion API answered, but with no content.
    #[error("Completion API returned an empty response")]
    EmptyResponse,

    /// The model answer was not JSON or did not have the expected shape.
    #[error("Malformed model response: {detail}")]
    MalformedResponse { detail: String },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    /// Classify this error into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::MissingUrl => ErrorKind::BadRequest,
            ScrapeError::BrowserLaunch { .. }
            | ScrapeError::Navigation { .. }
            | ScrapeError::RenderTimeout { .. } => ErrorKind::Render,
            ScrapeError::RateLimitExhausted { .. } => ErrorKind::ModelRateLimited,
            ScrapeError::Model { .. } => ErrorKind::Model,
            ScrapeError::EmptyResponse | ScrapeError::MalformedResponse { .. } => {
                ErrorKind::MalformedResponse
            }
            ScrapeError::InvalidConfig(_) | ScrapeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message a caller of the HTTP API (or the CLI) should see.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        self.kind().user_message(locale)
    }
}

/// Coarse error taxonomy shared by the pipeline and the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent an unusable request. Client-error class.
    BadRequest,
    /// The caller exceeded the inbound request budget.
    TooManyRequests,
    /// Launch, navigation or timeout failure in the renderer.
    Render,
    /// The completion API kept rate limiting us.
    ModelRateLimited,
    /// Any other completion API failure.
    Model,
    /// Empty, non-JSON or wrongly shaped model output.
    MalformedResponse,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// HTTP status code class for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::TooManyRequests => 429,
            _ => 500,
        }
    }

    /// One canonical message per kind and locale.
    ///
    /// Every pipeline failure collapses to the same message so internal
    /// detail never reaches the caller.
    pub fn user_message(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ErrorKind::BadRequest, Locale::English) => "URL is required.",
            (ErrorKind::BadRequest, Locale::Greek) => "Το URL είναι απαραίτητο.",
            (ErrorKind::TooManyRequests, Locale::English) => {
                "Too many requests from this IP. Please try again in a minute."
            }
            (ErrorKind::TooManyRequests, Locale::Greek) => {
                "Υπερβήκατε το όριο αιτημάτων από αυτή την IP. Παρακαλώ δοκιμάστε ξανά μετά από ένα λεπτό."
            }
            (_, Locale::English) => "Failed to retrieve the content of the web page.",
            (_, Locale::Greek) => "Αποτυχία ανάκτησης του περιεχομένου της ιστοσελίδας.",
        }
    }
}

/// A failed single attempt against the completion API.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// HTTP 429 or a `rate_limit_exceeded` error code. Retryable.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success answer from the API.
    #[error("HTTP {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never got an answer (DNS, TLS, connection reset, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// The API answered 2xx but the body was not a chat completion.
    #[error("could not decode completion body: {0}")]
    Decode(String),
}

impl CompletionError {
    /// Whether the backoff loop should try again.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited { .. })
    }

    /// The server's `retry-after` hint, when it sent one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CompletionError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}
