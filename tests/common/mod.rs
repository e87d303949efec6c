//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pagesift::{
    CompletionClient, CompletionError, PageRenderer, RenderedPage, ScrapeConfig, ScrapeError,
    Scraper, Sleeper,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves fixed HTML, or fails like a browser that cannot reach the page.
pub struct FakeRenderer {
    html: Option<String>,
    calls: AtomicU32,
}

impl FakeRenderer {
    pub fn page(html: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            html: Some(html.into()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            html: None,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.html {
            Some(html) => Ok(RenderedPage {
                html: html.clone(),
                final_url: Some(url.to_string()),
                render_ms: 5,
            }),
            None => Err(ScrapeError::Navigation {
                url: url.to_string(),
                detail: "net::ERR_NAME_NOT_RESOLVED".into(),
            }),
        }
    }
}

/// Plays back a fixed list of answers and records every prompt it receives.
pub struct ScriptedClient {
    answers: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(answers: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(json: &str) -> Arc<Self> {
        Self::new(vec![Ok(json.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Transport("script exhausted".into())))
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub fn rate_limited() -> Result<String, CompletionError> {
    Err(CompletionError::RateLimited {
        message: "Rate limit reached for model `llama-3.3-70b-versatile`".into(),
        retry_after_secs: None,
    })
}

pub fn test_config() -> ScrapeConfig {
    ScrapeConfig::builder().api_key("gsk_test").build().unwrap()
}

pub fn scraper(
    config: ScrapeConfig,
    renderer: Arc<FakeRenderer>,
    client: Arc<ScriptedClient>,
    sleeper: Arc<RecordingSleeper>,
) -> Scraper {
    Scraper::with_components(config, renderer, client, sleeper)
}

pub const CONTACT_PAGE: &str = "<html><head><title>Shop</title></head><body>\
    <h1>Corner Shop</h1>\
    <p>Contact info@shop.com or 555-123-4567. </p>\
    <p>Visit 12 Main Street. </p>\
    </body></html>";

pub const MODEL_ANSWER: &str = r#"{"phoneNumbers":["+1 (800) 555-0000"],"addresses":["1 Infinite Loop, Cupertino"],"summary":"A small corner shop."}"#;
