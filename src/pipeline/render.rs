//! Page rendering: load a URL in headless Chromium and serialise the DOM.
//!
//! ## One browser per call
//!
//! Every [`ChromiumRenderer::render`] call launches its own browser with a
//! throwaway profile directory and tears it down afterwards, so no cookies,
//! cache or storage carry over between requests.
//!
//! ## When is a page "loaded"?
//!
//! Once the initial DOM is parsed (`document.readyState` has left
//! `"loading"`). Subresources and content injected by late-running scripts
//! are not waited for. The whole render, launch included, is bounded by
//! [`crate::config::ScrapeConfig::render_timeout_secs`].

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::output::RenderedPage;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Loads a URL and returns its rendered HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScrapeError>;
}

/// Flags for running Chromium inside containers without a sandbox or GPU.
const CONTAINER_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

const DOM_READY_JS: &str =
    "document.location.href !== 'about:blank' && document.readyState !== 'loading'";

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a graceful browser shutdown before it is killed on drop.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`PageRenderer`] backed by chromiumoxide.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    user_agent: String,
    chrome_executable: Option<PathBuf>,
    render_timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            chrome_executable: config.chrome_executable.clone(),
            render_timeout: config.render_timeout(),
        }
    }

    /// Command-line arguments passed to Chromium, besides `--no-sandbox`.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args: Vec<String> = CONTAINER_ARGS.iter().map(|a| a.to_string()).collect();
        args.push(format!("--user-agent={}", self.user_agent));
        args
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .request_timeout(self.render_timeout)
            .args(self.launch_args());
        if let Some(exe) = &self.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        builder
            .build()
            .map_err(|detail| ScrapeError::BrowserLaunch { detail })
    }

    fn timed_out(&self, url: &str) -> ScrapeError {
        ScrapeError::RenderTimeout {
            url: url.to_string(),
            secs: self.render_timeout.as_secs(),
        }
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, ScrapeError> {
        let start = Instant::now();

        let profile = tempfile::Builder::new()
            .prefix("pagesift-profile-")
            .tempdir()
            .map_err(|e| ScrapeError::BrowserLaunch {
                detail: format!("cannot create profile directory: {e}"),
            })?;
        let browser_config = self.browser_config(profile.path())?;

        // ── Step 1: Launch ───────────────────────────────────────────────
        let (mut browser, mut handler) = timeout(self.render_timeout, Browser::launch(browser_config))
            .await
            .map_err(|_| self.timed_out(url))?
            .map_err(|e| ScrapeError::BrowserLaunch {
                detail: e.to_string(),
            })?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });
        debug!("Browser launched in {:?}", start.elapsed());

        // ── Step 2: Navigate and serialise ───────────────────────────────
        let remaining = self.render_timeout.saturating_sub(start.elapsed());
        let loaded = timeout(remaining, load_page(&browser, url)).await;

        // ── Step 3: Tear down, whatever happened above ───────────────────
        match timeout(CLOSE_TIMEOUT, browser.close()).await {
            Ok(Ok(_)) => {
                let _ = timeout(CLOSE_TIMEOUT, browser.wait()).await;
            }
            Ok(Err(e)) => warn!("Browser close failed: {}", e),
            Err(_) => warn!("Browser did not close within {:?}", CLOSE_TIMEOUT),
        }
        handler_task.abort();
        drop(browser);
        if let Err(e) = profile.close() {
            debug!("Could not remove browser profile: {}", e);
        }

        let (html, final_url) = loaded.map_err(|_| self.timed_out(url))??;
        let render_ms = start.elapsed().as_millis() as u64;
        info!("Rendered {} ({} bytes HTML) in {}ms", url, html.len(), render_ms);

        Ok(RenderedPage {
            html,
            final_url,
            render_ms,
        })
    }
}

async fn load_page(browser: &Browser, url: &str) -> Result<(String, Option<String>), ScrapeError> {
    let nav_err = |detail: String| ScrapeError::Navigation {
        url: url.to_string(),
        detail,
    };

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| nav_err(format!("cannot open tab: {e}")))?;

    let nav = page
        .execute(NavigateParams::new(url))
        .await
        .map_err(|e| nav_err(e.to_string()))?;
    if let Some(error_text) = nav.result.error_text.clone() {
        return Err(nav_err(error_text));
    }

    loop {
        let ready = page
            .evaluate(DOM_READY_JS)
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            break;
        }
        sleep(READY_POLL_INTERVAL).await;
    }

    let html = page
        .content()
        .await
        .map_err(|e| nav_err(format!("cannot serialise DOM: {e}")))?;
    let final_url = page.url().await.ok().flatten();

    Ok((html, final_url))
}
