//! The scrape orchestrator.
//!
//! [`Scraper`] owns the two I/O-bound collaborators (renderer, completion
//! client) behind traits and sequences the pipeline for one URL:
//!
//! ```text
//! render ─▶ extract text ─┬─▶ extract patterns ─────────────────────┐
//!                         └─▶ build prompt ─▶ complete ─▶ normalize ┴─▶ merge
//! ```
//!
//! Any stage can fail; the first failure ends the scrape and is returned as
//! a [`ScrapeError`]. Requests share nothing but the read-only config, so one
//! `Scraper` can be cloned into every request handler.

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::output::{
    ModelExtraction, ScrapeReport, ScrapeRequest, ScrapeResponse, ScrapeStats,
};
use crate::pipeline::llm::{
    complete_with_backoff, CompletionClient, GroqClient, RetryPolicy, Sleeper, TokioSleeper,
};
use crate::pipeline::normalize::normalize;
use crate::pipeline::patterns::extract_patterns;
use crate::pipeline::render::{ChromiumRenderer, PageRenderer};
use crate::pipeline::text::extract_text;
use crate::progress::Stage;
use crate::prompts::build_prompt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs scrapes against a fixed configuration.
#[derive(Clone)]
pub struct Scraper {
    config: Arc<ScrapeConfig>,
    renderer: Arc<dyn PageRenderer>,
    client: Arc<dyn CompletionClient>,
    sleeper: Arc<dyn Sleeper>,
}

/// What the model branch hands back to the join point.
struct ModelBranch {
    model: ModelExtraction,
    prompt_chars: usize,
    truncated: bool,
    attempts: u32,
    model_ms: u64,
}

impl Scraper {
    /// Build a scraper with headless Chromium, the Groq client and real sleeps.
    pub fn new(config: ScrapeConfig) -> Result<Self, ScrapeError> {
        let renderer = Arc::new(ChromiumRenderer::new(&config));
        let client = Arc::new(GroqClient::new(&config)?);
        Ok(Self::with_components(
            config,
            renderer,
            client,
            Arc::new(TokioSleeper),
        ))
    }

    /// Build a scraper from explicit collaborators.
    pub fn with_components(
        config: ScrapeConfig,
        renderer: Arc<dyn PageRenderer>,
        client: Arc<dyn CompletionClient>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            renderer,
            client,
            sleeper,
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Scrape the URL carried by `request`.
    pub async fn handle(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, ScrapeError> {
        self.scrape(request.url.as_deref().unwrap_or_default()).await
    }

    /// Scrape `url` and return the compatible response shape.
    pub async fn scrape(&self, url: &str) -> Result<ScrapeResponse, ScrapeError> {
        self.scrape_report(url).await.map(ScrapeReport::into_response)
    }

    /// Scrape `url` and return both extraction sources plus timings.
    ///
    /// # Errors
    /// * [`ScrapeError::MissingUrl`] for a blank URL, before anything runs
    /// * render errors when the page cannot be loaded in time
    /// * model errors when the completion API fails or keeps rate limiting
    /// * [`ScrapeError::EmptyResponse`] / [`ScrapeError::MalformedResponse`]
    ///   when the model answer is unusable
    pub async fn scrape_report(&self, url: &str) -> Result<ScrapeReport, ScrapeError> {
        let total_start = Instant::now();
        let url = url.trim();
        if url.is_empty() {
            return Err(ScrapeError::MissingUrl);
        }
        info!("Starting scrape: {}", url);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_scrape_start(url);
        }

        // ── Step 1: Render ───────────────────────────────────────────────
        let page = self
            .run_stage(Stage::Render, self.renderer.render(url))
            .await?;

        // ── Step 2: Extract text ─────────────────────────────────────────
        let text = self
            .run_stage(Stage::ExtractText, async { Ok(extract_text(&page.html)) })
            .await?;
        debug!("Page text: {} chars", text.chars().count());

        // ── Step 3: Patterns ∥ prompt → model → normalize ────────────────
        let (patterns, model) = tokio::join!(
            self.run_stage(Stage::ExtractPatterns, async { Ok(extract_patterns(&text)) }),
            self.model_branch(&text),
        );
        let patterns = patterns?;
        let model = model?;

        // ── Step 4: Merge ────────────────────────────────────────────────
        let response = ScrapeResponse::merge(&patterns, &model.model);
        let total_ms = total_start.elapsed().as_millis() as u64;
        let stats = ScrapeStats {
            render_ms: page.render_ms,
            text_chars: text.chars().count(),
            prompt_chars: model.prompt_chars,
            truncated: model.truncated,
            model_attempts: model.attempts,
            model_ms: model.model_ms,
            total_ms,
        };

        info!(
            "Scrape complete: {} emails, {} phone numbers, {} addresses, {}ms total",
            response.extracted_data.emails.len(),
            response.extracted_data.phone_numbers.len(),
            response.extracted_data.addresses.len(),
            total_ms
        );
        if let Some(cb) = &self.config.progress_callback {
            cb.on_scrape_complete(total_ms);
        }

        Ok(ScrapeReport {
            url: url.to_string(),
            final_url: page.final_url,
            response,
            patterns,
            model: model.model,
            stats,
        })
    }

    async fn model_branch(&self, text: &str) -> Result<ModelBranch, ScrapeError> {
        let prompt = self
            .run_stage(Stage::BuildPrompt, async {
                Ok(build_prompt(
                    text,
                    self.config.max_prompt_chars,
                    self.config.locale,
                ))
            })
            .await?;
        if prompt.truncated {
            info!(
                "Page text truncated to {} chars for the prompt",
                prompt.embedded_chars
            );
        }

        let model_start = Instant::now();
        let completion = self
            .run_stage(
                Stage::Complete,
                complete_with_backoff(
                    self.client.as_ref(),
                    &prompt.text,
                    RetryPolicy::from_config(&self.config),
                    self.sleeper.as_ref(),
                    self.config.progress_callback.as_ref(),
                ),
            )
            .await?;
        let model_ms = model_start.elapsed().as_millis() as u64;

        let model = self
            .run_stage(Stage::Normalize, async { normalize(&completion.content) })
            .await?;

        Ok(ModelBranch {
            model,
            prompt_chars: prompt.embedded_chars,
            truncated: prompt.truncated,
            attempts: completion.attempts,
            model_ms,
        })
    }

    /// Await `fut`, reporting start, end and failure of `stage`.
    async fn run_stage<T, F>(&self, stage: Stage, fut: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = Result<T, ScrapeError>>,
    {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_stage_start(stage);
        }
        let start = Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                debug!("Stage {} done in {}ms", stage, elapsed_ms);
                if let Some(cb) = cb {
                    cb.on_stage_complete(stage, elapsed_ms);
                }
            }
            Err(e) => {
                error!("Stage {} failed after {}ms: {}", stage, elapsed_ms, e);
                if let Some(cb) = cb {
                    cb.on_stage_failed(stage, &e.to_string());
                }
            }
        }
        result
    }
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper")
            .field("config", &self.config)
            .field("model", &self.client.model())
            .finish_non_exhaustive()
    }
}
