//! Process-wide `tracing` subscriber setup for the binary.
//!
//! The library only emits events; this module decides where they go. The
//! server logs JSON lines to `combined.log` (everything at the active level)
//! and `error.log` (errors only), mirrored to stderr in human-readable form
//! unless running in production. `RUST_LOG` overrides the level.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const COMBINED_LOG: &str = "combined.log";
pub const ERROR_LOG: &str = "error.log";

/// Where the server writes its logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    /// Level used when `RUST_LOG` is unset.
    pub level: String,
    /// Mirror events to stderr.
    pub console: bool,
}

/// Whether the stderr mirror is on for the given environment name.
pub fn console_enabled(env: Option<&str>) -> bool {
    !matches!(env.map(str::trim), Some(e) if e.eq_ignore_ascii_case("production"))
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))
}

/// File logging plus optional console mirror, for `serve`.
pub fn init_server(config: &LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("cannot create log directory {}", config.dir.display()))?;
    let combined = open_append(&config.dir.join(COMBINED_LOG))?;
    let errors = open_append(&config.dir.join(ERROR_LOG))?;

    let console = config
        .console
        .then(|| fmt::layer().with_writer(io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(combined)),
        )
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(errors))
                .with_filter(LevelFilter::ERROR),
        )
        .with(console)
        .try_init()
        .context("a global tracing subscriber is already installed")?;
    Ok(())
}

/// Stderr-only logging, for one-shot commands.
pub fn init_console(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install tracing subscriber: {e}"))
}
