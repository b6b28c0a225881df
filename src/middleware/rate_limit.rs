//! Fixed-window rate limiting, keyed per client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::context::Context;
use crate::handler::Handler;

/// Windows are swept for expired keys once the map grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

/// Configuration for [`rate_limit`].
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Length of one counting window. Default 60 s.
    pub window: Duration,
    /// Requests allowed per key and window. Default `100`.
    pub max: u32,
    /// Body of the `429` response.
    pub message: String,
    /// Derives the client key from a request. Default: first
    /// `x-forwarded-for` entry, else the peer IP.
    pub key: fn(&Context) -> String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max: 100,
            message: "Too many requests, please try again later.".to_owned(),
            key: client_key,
        }
    }
}

fn client_key(ctx: &Context) -> String {
    let req = ctx.request();
    req.header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .or_else(|| req.remote_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_owned())
}

#[derive(Debug)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Result of counting one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub resets_in: Duration,
}

/// The counters behind [`rate_limit`]. Owned by the handler it produces.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, windows: DashMap::new() }
    }

    /// Counts one request for `key` at `now`.
    pub fn check(&self, key: &str, now: Instant) -> RateDecision {
        let decision = {
            let mut window = self.windows
                .entry(key.to_owned())
                .or_insert_with(|| Window { count: 0, resets_at: now + self.config.window });
            if now >= window.resets_at {
                window.count = 0;
                window.resets_at = now + self.config.window;
            }
            window.count = window.count.saturating_add(1);
            RateDecision {
                allowed: window.count <= self.config.max,
                remaining: self.config.max.saturating_sub(window.count),
                resets_in: window.resets_at.saturating_duration_since(now),
            }
        };

        if self.windows.len() > SWEEP_THRESHOLD {
            self.windows.retain(|_, w| w.resets_at > now);
        }
        decision
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    pub fn into_handler(self) -> Handler {
        let limiter = Arc::new(self);
        Handler::chained(move |ctx, next| {
            let limiter = Arc::clone(&limiter);
            Box::pin(async move {
                let key = (limiter.config.key)(ctx);
                let decision = limiter.check(&key, Instant::now());
                let reset_secs = decision.resets_in.as_secs_f64().ceil() as u64;

                let res = ctx.response();
                res.set_header("x-ratelimit-limit", limiter.config.max.to_string());
                res.set_header("x-ratelimit-remaining", decision.remaining.to_string());
                res.set_header("x-ratelimit-reset", reset_secs.to_string());

                if decision.allowed {
                    next.run(ctx).await;
                } else {
                    res.set_header("retry-after", reset_secs.to_string());
                    res.status(429).text(limiter.config.message.as_str());
                }
                Ok(())
            })
        })
    }
}

/// Answers `429` once a client exceeds `max` requests within `window`.
pub fn rate_limit(config: RateLimitConfig) -> Handler {
    RateLimiter::new(config).into_handler()
}
