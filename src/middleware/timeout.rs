//! Request deadline.

use std::time::Duration;

use crate::handler::Handler;
use crate::response::ContentType;

/// Configuration for [`timeout_with`].
#[derive(Clone, Debug)]
pub struct TimeoutConfig {
    /// Time allowed before the `408`. Default 30 s.
    pub duration: Duration,
    /// Body of the `408` response.
    pub message: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(30),
            message: "Request Timeout".to_owned(),
        }
    }
}

/// Ends the response with `408` if nothing else has ended it within
/// `duration`.
pub fn timeout(duration: Duration) -> Handler {
    timeout_with(TimeoutConfig { duration, ..TimeoutConfig::default() })
}

/// [`timeout`] with a custom message.
///
/// The timer runs on its own task with a clone of the response, so it also
/// answers requests whose chain stalled or finished without a response. The
/// rest of the chain is not cancelled when the timer fires; its later
/// writes are dropped.
pub fn timeout_with(config: TimeoutConfig) -> Handler {
    Handler::chained(move |ctx, next| {
        let TimeoutConfig { duration, message } = config.clone();
        Box::pin(async move {
            let res = ctx.response().clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                res.end_if_open(408, ContentType::Text, message);
            });

            next.run(ctx).await;

            if ctx.response().is_ended() {
                timer.abort();
            }
            Ok(())
        })
    })
}
