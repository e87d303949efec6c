//! HTTP front end: JSON endpoints over a shared [`Scraper`].
//!
//! ```text
//! POST /scrape          { "url": … } → ScrapeResponse | { "error": … }
//! POST /scrape/report   { "url": … } → ScrapeReport   | { "error": … }
//! GET  /health          → { "status": "ok", "version": … }
//! GET  /*               → static files (optional)
//! ```
//!
//! The scrape routes sit behind the per-IP [`RateLimiter`]. Failures never
//! leak internal detail: the body carries the canonical message for the
//! error kind in the configured locale, the detail goes to the log.

use crate::config::Locale;
use crate::error::{ErrorKind, ScrapeError};
use crate::output::{ScrapeReport, ScrapeRequest, ScrapeResponse};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::scrape::Scraper;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared by every request handler.
pub struct AppState {
    pub scraper: Scraper,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(scraper: Scraper, rate_limit: RateLimitConfig) -> Self {
        Self {
            scraper,
            limiter: Arc::new(RateLimiter::new(rate_limit)),
        }
    }

    fn locale(&self) -> Locale {
        self.scraper.config().locale
    }
}

/// Where and how to listen.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Directory served for unmatched GETs; `None` disables static hosting.
    pub static_dir: Option<PathBuf>,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            static_dir: Some(PathBuf::from("public")),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

/// A failure as the caller sees it: a status and a canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl ApiError {
    pub fn new(kind: ErrorKind, locale: Locale) -> Self {
        Self {
            status: StatusCode::from_u16(kind.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: kind.user_message(locale),
        }
    }

    fn from_scrape(err: &ScrapeError, locale: Locale) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => warn!("Rejected request: {}", err),
            _ => error!("Scrape failed: {}", err),
        }
        Self::new(err.kind(), locale)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// A body that is not JSON, or not an object, is treated like one without a URL.
fn request_or_default(payload: Result<Json<ScrapeRequest>, JsonRejection>) -> ScrapeRequest {
    match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Unreadable request body: {}", rejection);
            ScrapeRequest::default()
        }
    }
}

async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let request = request_or_default(payload);
    state
        .scraper
        .handle(&request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_scrape(&e, state.locale()))
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeReport>, ApiError> {
    let request = request_or_default(payload);
    state
        .scraper
        .scrape_report(request.url.as_deref().unwrap_or_default())
        .await
        .map(Json)
        .map_err(|e| ApiError::from_scrape(&e, state.locale()))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match state.limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            let mut resp = ApiError::new(ErrorKind::TooManyRequests, state.locale()).into_response();
            resp.headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(e.retry_after_secs));
            resp
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/scrape/report", post(report_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route("/health", get(health_handler))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind, serve until Ctrl-C / SIGTERM, then drain in-flight requests.
pub async fn serve(config: ServerConfig, scraper: Scraper) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(scraper, config.rate_limit.clone()));
    let cleanup = state.limiter.clone().start_cleanup_task();
    let app = router(state, config.static_dir.clone());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    cleanup.abort();
    info!("Server stopped");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
