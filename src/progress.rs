//! Progress-callback trait for per-stage scrape events.
//!
//! Inject an [`Arc<dyn ScrapeProgressCallback>`] via
//! [`crate::config::ScrapeConfigBuilder::progress_callback`] to observe the
//! pipeline as it moves from rendering to the validated model answer. The
//! CLI uses it to drive a spinner; the server leaves it unset.
//!
//! # Example
//!
//! ```rust
//! use pagesift::{ScrapeConfig, ScrapeProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ScrapeProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ScrapeConfig::builder()
//!     .api_key("gsk_test")
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// A step of the scrape pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Launch the browser, load the page, serialise the DOM.
    Render,
    /// Strip markup from the rendered HTML.
    ExtractText,
    /// Run the email / phone / address patterns.
    ExtractPatterns,
    /// Truncate the text and fill in the prompt template.
    BuildPrompt,
    /// Call the completion API (including backoff waits).
    Complete,
    /// Sanitise, parse and validate the model answer.
    Normalize,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Render => "render",
            Stage::ExtractText => "extract-text",
            Stage::ExtractPatterns => "extract-patterns",
            Stage::BuildPrompt => "build-prompt",
            Stage::Complete => "complete",
            Stage::Normalize => "normalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the scrape pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pattern branch and the model branch run
/// concurrently, so `on_stage_*` calls for different stages may interleave.
pub trait ScrapeProgressCallback: Send + Sync {
    /// Called once, after the URL has been accepted.
    fn on_scrape_start(&self, url: &str) {
        let _ = url;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called before a backoff wait.
    ///
    /// # Arguments
    /// * `attempt`  — 1-indexed attempt that was rate limited
    /// * `delay_ms` — wait before the next attempt
    fn on_retry(&self, attempt: u32, delay_ms: u64) {
        let _ = (attempt, delay_ms);
    }

    /// Called when a stage fails; the scrape ends with an error.
    fn on_stage_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the response has been assembled.
    fn on_scrape_complete(&self, total_ms: u64) {
        let _ = total_ms;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ScrapeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScrapeConfig`].
pub type ProgressCallback = Arc<dyn ScrapeProgressCallback>;
