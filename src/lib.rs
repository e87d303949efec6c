//! # pagesift
//!
//! Render a web page in headless Chromium, pull contact details out of it,
//! and have a language model summarise it.
//!
//! ## Why render?
//!
//! Many sites ship an empty HTML shell and build the page in JavaScript. A
//! plain HTTP fetch sees none of the content; a browser does. The rendered
//! text then goes two ways: cheap regexes find emails deterministically,
//! and a completion model reads a capped excerpt for phone numbers,
//! addresses and a summary.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Render    fresh headless Chromium, DOM parsed, HTML serialised
//!  ├─ 2. Text      body text via scraper
//!  ├─ 3. Patterns  email / phone / address regexes over the full text  ┐
//!  ├─ 4. Prompt    first 3000 chars in a fixed template                │ concurrent
//!  ├─ 5. Model     Groq chat completion, backoff on rate limits        │
//!  ├─ 6. Validate  strip fences, parse, check the JSON shape           ┘
//!  └─ 7. Merge     emails from 3, everything else from 6
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesift::{ScrapeConfig, Scraper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScrapeConfig::builder()
//!         .api_key(std::env::var("GROQ_API_KEY")?)
//!         .build()?;
//!     let scraper = Scraper::new(config)?;
//!     let response = scraper.scrape("https://example.com").await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | via cli | axum HTTP service with per-IP rate limiting |
//! | `cli`    | on      | The `pagesift` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Library-only use:
//! ```toml
//! pagesift = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod rate_limit;
pub mod scrape;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Locale, ScrapeConfig, ScrapeConfigBuilder};
pub use error::{CompletionError, ErrorKind, ScrapeError};
pub use output::{
    ExtractedData, ModelExtraction, PatternExtraction, RenderedPage, ScrapeReport, ScrapeRequest,
    ScrapeResponse, ScrapeStats,
};
pub use pipeline::llm::{CompletionClient, Sleeper};
pub use pipeline::render::PageRenderer;
pub use progress::{NoopProgressCallback, ProgressCallback, ScrapeProgressCallback, Stage};
pub use scrape::Scraper;
