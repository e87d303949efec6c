//! Per-IP admission control for the HTTP service.
//!
//! A token bucket per client address: `burst` tokens to start with, refilled
//! at `requests_per_minute / 60` tokens per second. With the defaults
//! (10/min, burst 10) a client can fire 10 scrapes at once and then one
//! every 6 seconds. Idle buckets are dropped by a background sweep.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A request was refused.
#[derive(Debug, Clone, Error)]
#[error("Rate limit exceeded for {ip}; retry after {retry_after_secs}s")]
pub struct RateLimitError {
    pub ip: IpAddr,
    pub retry_after_secs: u64,
}

/// Limits applied per client address.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sustained rate. Default: 10.
    pub requests_per_minute: u32,
    /// Requests allowed back to back. Default: 10.
    pub burst: u32,
    /// Idle time after which a bucket is forgotten. Default: 5 minutes.
    pub bucket_ttl: Duration,
    /// How often idle buckets are swept. Default: 60 s.
    pub cleanup_interval: Duration,
    /// `false` admits everything.
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

impl RateLimitConfig {
    /// `n` requests per minute with a burst of `n`; `0` disables limiting.
    pub fn per_minute(n: u32) -> Self {
        Self {
            requests_per_minute: n,
            burst: n,
            bucket_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            enabled: n > 0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn tokens_per_second(&self) -> f64 {
        self.requests_per_minute as f64 / 60.0
    }
}

// ── Token bucket ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_per_sec,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available.
    fn try_take(&mut self, now: Instant) -> Result<(), u64> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else if self.refill_per_sec <= 0.0 {
            Err(u64::MAX)
        } else {
            Err(((1.0 - self.tokens) / self.refill_per_sec).ceil() as u64)
        }
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_refill) > ttl
    }
}

// ── Limiter ──────────────────────────────────────────────────────────────

/// Tracks one [`TokenBucket`] per client address.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        if config.enabled {
            info!(
                "Rate limiting: {} req/min per IP, burst {}",
                config.requests_per_minute, config.burst
            );
        } else {
            info!("Rate limiting disabled");
        }
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or refuse one request from `ip`.
    pub async fn check(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(ip).or_insert_with(|| {
            TokenBucket::new(self.config.burst, self.config.tokens_per_second(), now)
        });

        bucket.try_take(now).map_err(|retry_after_secs| {
            warn!("Rate limit exceeded for {}: retry after {}s", ip, retry_after_secs);
            RateLimitError {
                ip,
                retry_after_secs,
            }
        })
    }

    /// Number of tracked addresses.
    pub async fn bucket_count(&self) -> usize {
        self.buckets.lock().await.len()
    }

    async fn sweep(&self, now: Instant) {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, b| !b.is_idle(now, self.config.bucket_ttl));
        let removed = before - buckets.len();
        if removed > 0 {
            debug!("Dropped {} idle rate-limit buckets", removed);
        }
    }

    /// Spawn the periodic sweep of idle buckets. Runs until the runtime stops.
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep(Instant::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[tokio::test]
    async fn allows_burst_then_refuses() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(10));
        let now = Instant::now();
        for _ in 0..10 {
            limiter.check_at(ip(1), now).await.unwrap();
        }
        let err = limiter.check_at(ip(1), now).await.unwrap_err();
        assert!((6..=7).contains(&err.retry_after_secs));
        assert_eq!(err.ip, ip(1));
    }

    #[tokio::test]
    async fn refills_over_time() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(10));
        let now = Instant::now();
        for _ in 0..10 {
            limiter.check_at(ip(1), now).await.unwrap();
        }
        assert!(limiter.check_at(ip(1), now).await.is_err());
        let later = now + Duration::from_secs(7);
        assert!(limiter.check_at(ip(1), later).await.is_ok());
        assert!(limiter.check_at(ip(1), later).await.is_err());
    }

    #[tokio::test]
    async fn addresses_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(1));
        let now = Instant::now();
        limiter.check_at(ip(1), now).await.unwrap();
        assert!(limiter.check_at(ip(1), now).await.is_err());
        limiter.check_at(ip(2), now).await.unwrap();
        assert_eq!(limiter.bucket_count().await, 2);
    }

    #[tokio::test]
    async fn disabled_admits_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(0));
        for _ in 0..100 {
            limiter.check(ip(1)).await.unwrap();
        }
        assert_eq!(limiter.bucket_count().await, 0);
        assert!(!RateLimitConfig::disabled().enabled);
    }

    #[tokio::test]
    async fn sweep_drops_idle_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(10));
        let now = Instant::now();
        limiter.check_at(ip(1), now).await.unwrap();
        limiter.sweep(now + Duration::from_secs(10)).await;
        assert_eq!(limiter.bucket_count().await, 1);
        limiter.sweep(now + Duration::from_secs(301)).await;
        assert_eq!(limiter.bucket_count().await, 0);
    }
}
