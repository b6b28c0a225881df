//! Outgoing HTTP response handle and the [`IntoBody`] conversion trait.
//!
//! Every request gets one [`Response`]. Handlers set a status and headers on
//! it and finish it with one of the ending helpers: [`json`](Response::json),
//! [`send`](Response::send), [`text`](Response::text),
//! [`redirect`](Response::redirect) or [`end`](Response::end). The first ending call delivers the message to the
//! connection; the pipeline stops running handlers once it sees the response
//! has ended.
//!
//! The handle is cheap to clone. A clone can outlive the pipeline (the
//! timeout middleware keeps one on a timer task); the connection waits until
//! some clone ends the response or every clone is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::Error;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values the response helpers write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Html,         // text/html
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html        => "text/html",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain",
        }
    }
}

// ── IntoBody ──────────────────────────────────────────────────────────────────

/// Conversion of a value into a body for [`Response::send`].
///
/// The content type follows from the value's type:
///
/// | value | content-type |
/// |---|---|
/// | `&str`, `String` | `text/html` |
/// | `Vec<u8>`, `&[u8]`, `Bytes` | `application/octet-stream` |
/// | `serde_json::Value` object, array or null | `application/json` |
/// | numbers, `bool` | `text/plain` (stringified) |
pub trait IntoBody {
    fn into_body(self) -> (ContentType, Bytes);
}

impl IntoBody for &str {
    fn into_body(self) -> (ContentType, Bytes) {
        (ContentType::Html, Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl IntoBody for String {
    fn into_body(self) -> (ContentType, Bytes) {
        (ContentType::Html, Bytes::from(self))
    }
}

impl IntoBody for Vec<u8> {
    fn into_body(self) -> (ContentType, Bytes) {
        (ContentType::OctetStream, Bytes::from(self))
    }
}

impl IntoBody for &[u8] {
    fn into_body(self) -> (ContentType, Bytes) {
        (ContentType::OctetStream, Bytes::copy_from_slice(self))
    }
}

impl IntoBody for Bytes {
    fn into_body(self) -> (ContentType, Bytes) {
        (ContentType::OctetStream, self)
    }
}

impl IntoBody for serde_json::Value {
    fn into_body(self) -> (ContentType, Bytes) {
        use serde_json::Value;
        match self {
            Value::String(s) => s.into_body(),
            Value::Bool(b) => b.into_body(),
            Value::Number(n) => (ContentType::Text, Bytes::from(n.to_string())),
            // Serializing a `Value` cannot fail.
            other => (ContentType::Json, Bytes::from(other.to_string())),
        }
    }
}

macro_rules! stringified_body {
    ($($t:ty),*) => {$(
        impl IntoBody for $t {
            fn into_body(self) -> (ContentType, Bytes) {
                (ContentType::Text, Bytes::from(self.to_string()))
            }
        }
    )*};
}

stringified_body!(bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

// ── Sent ──────────────────────────────────────────────────────────────────────

/// A finished response, as delivered to the connection.
#[derive(Clone, Debug)]
pub struct Sent {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Sent {
    /// A `text/plain` response outside any pipeline (e.g. `404` at the server).
    pub(crate) fn plain(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_owned(), ContentType::Text.as_str().to_owned())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts to the hyper response type. Headers hyper rejects turn the
    /// whole response into an empty `500`.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Full::new(self.body))
            .unwrap_or_else(|e| {
                warn!("invalid response: {e}");
                let mut res = http::Response::new(Full::new(Bytes::new()));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            })
    }
}

/// Receives the finished response for one request.
///
/// Resolves to `Err` when every [`Response`] clone was dropped without the
/// response being ended.
pub type Delivery = oneshot::Receiver<Sent>;

// ── Response ─────────────────────────────────────────────────────────────────

/// The response handle passed to every handler through the
/// [`Context`](crate::Context).
///
/// ```rust,no_run
/// # use strand::{Context, Error};
/// # fn demo(ctx: &mut Context) -> Result<(), Error> {
/// ctx.response().status(201).json(&serde_json::json!({ "id": 42 }))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Response {
    shared: Arc<Mutex<State>>,
}

struct State {
    status: u16,
    headers: Vec<(String, String)>,
    sink: Option<oneshot::Sender<Sent>>,
}

impl Response {
    /// A fresh response (status 200) and the receiver its message is
    /// delivered on.
    pub fn channel() -> (Self, Delivery) {
        let (tx, rx) = oneshot::channel();
        let state = State { status: 200, headers: Vec::new(), sink: Some(tx) };
        (Self { shared: Arc::new(Mutex::new(state)) }, rx)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the status used when the response is ended. Returns `self`.
    pub fn status(&self, code: u16) -> &Self {
        self.state().status = code;
        self
    }

    /// The pending status (or the one sent, once ended).
    pub fn status_code(&self) -> u16 {
        self.state().status
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn set_header(&self, name: &str, value: impl Into<String>) -> &Self {
        let mut state = self.state();
        state.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        state.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Current value of a pending header.
    pub fn header(&self, name: &str) -> Option<String> {
        self.state().headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// `true` once any ending helper has run.
    pub fn is_ended(&self) -> bool {
        self.state().sink.is_none()
    }

    /// Serializes `value` as JSON and ends the response (`application/json`).
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        self.finish(None, Some(ContentType::Json), Bytes::from(body));
        Ok(())
    }

    /// Ends the response with `body`; see [`IntoBody`] for content types.
    pub fn send(&self, body: impl IntoBody) {
        let (content_type, bytes) = body.into_body();
        self.finish(None, Some(content_type), bytes);
    }

    /// Ends the response with a `text/plain` body.
    pub fn text(&self, body: impl Into<String>) {
        self.finish(None, Some(ContentType::Text), Bytes::from(body.into()));
    }

    /// `302 Found` redirect to `url`, no body.
    pub fn redirect(&self, url: &str) {
        self.redirect_with(url, 302);
    }

    /// Redirect to `url` with an explicit status (e.g. `301`).
    pub fn redirect_with(&self, url: &str, code: u16) {
        self.set_header("location", url);
        self.finish(Some(code), None, Bytes::new());
    }

    /// Ends the response with raw bytes and whatever headers are pending.
    pub fn end(&self, body: impl Into<Bytes>) {
        self.finish(None, None, body.into());
    }

    /// Ends the response with `status` and a typed body unless something
    /// already ended it. The check and the write happen under one lock, so
    /// a concurrent writer either wins completely or not at all.
    ///
    /// Returns `true` when this call delivered the response.
    pub fn end_if_open(&self, status: u16, content_type: ContentType, body: impl Into<Bytes>) -> bool {
        let mut state = self.state();
        if state.sink.is_none() {
            return false;
        }
        deliver(&mut state, Some(status), Some(content_type), body.into());
        true
    }

    fn finish(&self, status: Option<u16>, content_type: Option<ContentType>, body: Bytes) {
        let mut state = self.state();
        if state.sink.is_none() {
            warn!(status = state.status, "response already ended; write dropped");
            return;
        }
        deliver(&mut state, status, content_type, body);
    }
}

fn deliver(state: &mut State, status: Option<u16>, content_type: Option<ContentType>, body: Bytes) {
    let Some(sink) = state.sink.take() else { return };
    if let Some(code) = status {
        state.status = code;
    }
    if let Some(ct) = content_type {
        state.headers.retain(|(k, _)| k != "content-type");
        state.headers.push(("content-type".to_owned(), ct.as_str().to_owned()));
    }
    let sent = Sent {
        status: state.status,
        headers: state.headers.clone(),
        body,
    };
    // The receiver is gone when the client disconnected; nothing to do.
    let _ = sink.send(sent);
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Response")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("ended", &state.sink.is_none())
            .finish()
    }
}
