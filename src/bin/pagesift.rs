//! CLI binary for pagesift.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! onto `ScrapeConfig`, then either runs the HTTP service or scrapes one URL
//! and prints the JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pagesift::logging::{self, LogConfig};
use pagesift::rate_limit::RateLimitConfig;
use pagesift::server::{self, ServerConfig};
use pagesift::{Locale, ScrapeConfig, ScrapeProgressCallback, Scraper, Stage};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner naming the running stage, with one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Scraping");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ScrapeProgressCallback for CliProgressCallback {
    fn on_scrape_start(&self, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<17} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_retry(&self, attempt: u32, delay_ms: u64) {
        self.bar.println(format!(
            "  {} rate limited on attempt {attempt}, waiting {delay_ms}ms",
            yellow("↻"),
        ));
    }

    fn on_stage_failed(&self, stage: Stage, error: &str) {
        self.bar.println(format!("  {} {:<17} {}", red("✗"), stage.label(), red(error)));
        self.bar.finish_and_clear();
    }

    fn on_scrape_complete(&self, total_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} done in {:.1}s",
            green("✔"),
            total_ms as f64 / 1000.0
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 3000
  pagesift serve

  # Scrape one page and print the JSON response
  pagesift scrape https://example.com

  # Include pattern matches and timings
  pagesift scrape --report https://example.com

  # Greek prompt and messages
  pagesift --locale el serve

HTTP API:
  POST /scrape          {"url": "..."}  → {"extractedData": {...}, "summary": "..."}
  POST /scrape/report   {"url": "..."}  → response + pattern matches + stats
  GET  /health

ENVIRONMENT VARIABLES:
  GROQ_API_KEY               Completion API key (required)
  PAGESIFT_API_BASE          OpenAI-compatible base URL
  PAGESIFT_MODEL             Model ID
  CHROME_PATH                Chrome/Chromium executable
  PORT                       Listen port for `serve`
  PAGESIFT_ENV               `production` turns off the console log mirror
  PAGESIFT_LOG_DIR           Directory for combined.log and error.log
  RUST_LOG                   Log filter, overrides --verbose
"#;

/// Render web pages, extract contact details and summarise them with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pagesift",
    version,
    about = "Render web pages, extract contact details and summarise them with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAGESIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAGESIFT_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// API key for the completion service.
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, global = true, env = "PAGESIFT_API_BASE")]
    api_base: Option<String>,

    /// Completion model ID.
    #[arg(long, global = true, env = "PAGESIFT_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, global = true, env = "PAGESIFT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Characters of page text sent to the model.
    #[arg(long, global = true, env = "PAGESIFT_MAX_PROMPT_CHARS", default_value_t = 3000)]
    max_prompt_chars: usize,

    /// Total completion attempts when rate limited.
    #[arg(long, global = true, env = "PAGESIFT_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Wait before the second attempt, doubled for each later one.
    #[arg(long, global = true, env = "PAGESIFT_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Hard bound on rendering a page, in seconds.
    #[arg(long, global = true, env = "PAGESIFT_RENDER_TIMEOUT", default_value_t = 120)]
    render_timeout: u64,

    /// Per-request timeout for the completion API, in seconds.
    #[arg(long, global = true, env = "PAGESIFT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Chrome/Chromium executable. Searched for when unset.
    #[arg(long, global = true, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Language of the prompt and of user-facing error messages.
    #[arg(long, global = true, env = "PAGESIFT_LOCALE", value_enum, default_value = "en")]
    locale: LocaleArg,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Listen port.
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,

        /// Listen address.
        #[arg(long, env = "PAGESIFT_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Directory served for unmatched GET requests.
        #[arg(long, env = "PAGESIFT_STATIC_DIR", default_value = "public")]
        static_dir: PathBuf,

        /// Do not serve static files.
        #[arg(long)]
        no_static: bool,

        /// Scrape requests per minute per client IP (0 disables the limit).
        #[arg(long, env = "PAGESIFT_RATE_LIMIT", default_value_t = 10)]
        rate_limit: u32,

        /// Deployment environment; `production` turns off console logging.
        #[arg(long, env = "PAGESIFT_ENV")]
        env: Option<String>,

        /// Directory for combined.log and error.log.
        #[arg(long, env = "PAGESIFT_LOG_DIR", default_value = "logs")]
        log_dir: PathBuf,
    },

    /// Scrape one URL and print the result as JSON.
    Scrape {
        /// Page to scrape.
        url: String,

        /// Print the extended report (pattern matches, model answer, timings).
        #[arg(long)]
        report: bool,

        /// Single-line JSON instead of pretty-printed.
        #[arg(long)]
        compact: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LocaleArg {
    #[value(alias = "english")]
    En,
    #[value(alias = "greek", alias = "gr")]
    El,
}

impl From<LocaleArg> for Locale {
    fn from(v: LocaleArg) -> Self {
        match v {
            LocaleArg::En => Locale::English,
            LocaleArg::El => Locale::Greek,
        }
    }
}

impl PipelineArgs {
    fn to_config(&self, progress: Option<Arc<CliProgressCallback>>) -> Result<ScrapeConfig> {
        let mut builder = ScrapeConfig::builder()
            .api_key(self.api_key.clone().unwrap_or_default())
            .max_prompt_chars(self.max_prompt_chars)
            .max_attempts(self.max_attempts)
            .retry_backoff_ms(self.retry_backoff_ms)
            .render_timeout_secs(self.render_timeout)
            .api_timeout_secs(self.api_timeout)
            .locale(self.locale.into());
        if let Some(base) = &self.api_base {
            builder = builder.api_base(base);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if let Some(chrome) = &self.chrome {
            builder = builder.chrome_executable(chrome);
        }
        if let Some(cb) = progress {
            builder = builder.progress_callback(cb);
        }
        builder.build().context("invalid configuration")
    }
}

fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            static_dir,
            no_static,
            rate_limit,
            env,
            log_dir,
        } => {
            // ── Logging setup ────────────────────────────────────────────
            logging::init_server(&LogConfig {
                dir: log_dir,
                level: log_level(cli.verbose, cli.quiet).to_string(),
                console: logging::console_enabled(env.as_deref()),
            })?;

            // Missing credentials abort startup before the port is bound.
            let config = cli.pipeline.to_config(None)?;
            tracing::info!("Configuration: {:?}", config);
            let scraper = Scraper::new(config).context("cannot initialise scraper")?;

            let server_config = ServerConfig {
                host,
                port,
                static_dir: (!no_static).then_some(static_dir),
                rate_limit: RateLimitConfig::per_minute(rate_limit),
            };
            server::serve(server_config, scraper)
                .await
                .context("HTTP server failed")?;
        }

        Command::Scrape {
            url,
            report,
            compact,
        } => {
            // The spinner gives the feedback; only errors go to the log
            // unless --verbose.
            logging::init_console(if cli.verbose { "debug" } else { "error" })?;

            let progress = (!cli.quiet).then(CliProgressCallback::new);
            let config = cli.pipeline.to_config(progress)?;
            let locale = config.locale;
            let scraper = Scraper::new(config).context("cannot initialise scraper")?;

            let result = if report {
                scraper.scrape_report(&url).await.map(serde_json::to_value)
            } else {
                scraper.scrape(&url).await.map(serde_json::to_value)
            };

            let value = match result {
                Ok(v) => v.context("cannot serialise result")?,
                Err(e) => {
                    if !cli.quiet {
                        eprintln!("{} {}", red("✘"), e.user_message(locale));
                    }
                    return Err(e).context(format!("scrape of {url} failed"));
                }
            };

            let out = if compact {
                serde_json::to_string(&value)?
            } else {
                serde_json::to_string_pretty(&value)?
            };
            println!("{out}");
        }
    }

    Ok(())
}
