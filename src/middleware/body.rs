//! Body parsers.
//!
//! Each parser is a chained handler that claims requests of one media type:
//!
//! 1. `ctx.body` already set → pass through untouched.
//! 2. `content-type` is a different media type (or absent) → pass through.
//! 3. `content-length` over `limit`, or more than `limit` bytes arriving →
//!    `413`, chain stops. The advertised length is checked before reading.
//! 4. Malformed content → `400`, chain stops.
//! 5. Otherwise `ctx.body` is set and the chain continues.

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Collected, LengthLimitError, Limited};

use crate::context::{Context, ParsedBody};
use crate::error::BoxError;
use crate::handler::{BoxFuture, Handler};

const DEFAULT_LIMIT: usize = 100 * 1024;

/// Configuration for [`json`].
#[derive(Clone, Debug)]
pub struct JsonConfig {
    /// Maximum body size in bytes. Default 100 KiB.
    pub limit: usize,
    /// Media type claimed. Default `application/json`.
    pub content_type: String,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, content_type: "application/json".to_owned() }
    }
}

/// Configuration for [`urlencoded`].
#[derive(Clone, Debug)]
pub struct UrlencodedConfig {
    /// Maximum body size in bytes. Default 100 KiB.
    pub limit: usize,
    /// Media type claimed. Default `application/x-www-form-urlencoded`.
    pub content_type: String,
}

impl Default for UrlencodedConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            content_type: "application/x-www-form-urlencoded".to_owned(),
        }
    }
}

/// Configuration for [`text`].
#[derive(Clone, Debug)]
pub struct TextConfig {
    /// Maximum body size in bytes. Default 100 KiB.
    pub limit: usize,
    /// Media type claimed. Default `text/plain`.
    pub content_type: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, content_type: "text/plain".to_owned() }
    }
}

/// Configuration for [`raw`].
#[derive(Clone, Debug)]
pub struct RawConfig {
    /// Maximum body size in bytes. Default 100 KiB.
    pub limit: usize,
    /// Media type claimed. Default `application/octet-stream`.
    pub content_type: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, content_type: "application/octet-stream".to_owned() }
    }
}

/// Parses `application/json` into [`ParsedBody::Json`]. An empty body
/// becomes `{}`.
pub fn json(config: JsonConfig) -> Handler {
    parser(config.content_type, config.limit, |bytes| {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ParsedBody::Json(serde_json::Value::Object(Default::default())));
        }
        serde_json::from_slice(&bytes)
            .map(ParsedBody::Json)
            .map_err(|_| "Invalid JSON")
    })
}

/// Parses `application/x-www-form-urlencoded` into [`ParsedBody::Form`].
pub fn urlencoded(config: UrlencodedConfig) -> Handler {
    parser(config.content_type, config.limit, |bytes| {
        if std::str::from_utf8(&bytes).is_err() {
            return Err("Invalid URL-encoded body");
        }
        let form = url::form_urlencoded::parse(&bytes).into_owned().collect();
        Ok(ParsedBody::Form(form))
    })
}

/// Reads `text/plain` into [`ParsedBody::Text`]. The body must be UTF-8.
pub fn text(config: TextConfig) -> Handler {
    parser(config.content_type, config.limit, |bytes| {
        String::from_utf8(bytes.to_vec())
            .map(ParsedBody::Text)
            .map_err(|_| "Invalid UTF-8 text")
    })
}

/// Reads the configured media type into [`ParsedBody::Raw`].
pub fn raw(config: RawConfig) -> Handler {
    parser(config.content_type, config.limit, |bytes| Ok(ParsedBody::Raw(bytes)))
}

type Parse = fn(Bytes) -> Result<ParsedBody, &'static str>;

fn parser(content_type: String, limit: usize, parse: Parse) -> Handler {
    let content_type: Arc<str> = content_type.to_ascii_lowercase().into();
    Handler::chained(move |ctx, next| {
        let content_type = Arc::clone(&content_type);
        Box::pin(async move {
            let claimed = ctx.body.is_none()
                && ctx.request().media_type().as_deref() == Some(&*content_type);
            if !claimed {
                next.run(ctx).await;
                return Ok(());
            }

            let bytes = match read(ctx, limit).await {
                Ok(bytes) => bytes,
                Err(Rejection { status, message }) => {
                    ctx.response().status(status).text(message);
                    return Ok(());
                }
            };
            match parse(bytes) {
                Ok(body) => {
                    ctx.body = Some(body);
                    next.run(ctx).await;
                }
                Err(message) => ctx.response().status(400).text(message),
            }
            Ok(())
        })
    })
}

struct Rejection {
    status: u16,
    message: &'static str,
}

impl Rejection {
    const TOO_LARGE: Self = Self { status: 413, message: "Payload Too Large" };
}

/// Collects the body stream, enforcing `limit` on the advertised and the
/// observed size.
async fn read(ctx: &mut Context, limit: usize) -> Result<Bytes, Rejection> {
    if ctx.request().content_length().is_some_and(|len| len > limit as u64) {
        return Err(Rejection::TOO_LARGE);
    }
    let Some(stream) = ctx.take_body_stream() else {
        return Ok(Bytes::new());
    };
    // Boxed at a concrete error type so the parser's future stays `Send`.
    let collect: BoxFuture<'_, Result<Collected<Bytes>, BoxError>> =
        Box::pin(Limited::new(stream, limit).collect());
    match collect.await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Rejection::TOO_LARGE),
        Err(e) => {
            tracing::debug!("reading request body failed: {e}");
            Err(Rejection { status: 400, message: "Bad Request" })
        }
    }
}
