//! Per-request log line.

use std::time::Instant;

use tracing::{Level, debug, error, info, trace, warn};

use crate::handler::Handler;

/// Configuration for [`logger`].
#[derive(Clone, Copy, Debug)]
pub struct LoggerConfig {
    /// Level of the per-request event. Default `INFO`.
    pub level: Level,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

/// Emits one `tracing` event per request once the rest of the chain has
/// settled: method, path, status and latency in milliseconds.
///
/// Requests whose chain settled without a response are logged with
/// `status = 0`.
pub fn logger(config: LoggerConfig) -> Handler {
    Handler::chained(move |ctx, next| Box::pin(async move {
        let started = Instant::now();
        next.run(ctx).await;

        let res = ctx.response();
        let status = if res.is_ended() { res.status_code() } else { 0 };
        let method = ctx.request().method().as_str();
        let path = ctx.pathname();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        emit(config.level, method, path, status, elapsed_ms);
        Ok(())
    }))
}

// `tracing` macros need the level at compile time.
fn emit(level: Level, method: &str, path: &str, status: u16, elapsed_ms: f64) {
    if level == Level::ERROR {
        error!(method, path, status, elapsed_ms, "request");
    } else if level == Level::WARN {
        warn!(method, path, status, elapsed_ms, "request");
    } else if level == Level::INFO {
        info!(method, path, status, elapsed_ms, "request");
    } else if level == Level::DEBUG {
        debug!(method, path, status, elapsed_ms, "request");
    } else {
        trace!(method, path, status, elapsed_ms, "request");
    }
}
