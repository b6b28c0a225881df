//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use tracing::debug;

use crate::error::BoxError;
use crate::method::Method;

/// A streaming request body.
///
/// Body parsers consume it at most once; see [`Context::take_body_stream`](crate::Context::take_body_stream).
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request, as handed over by the transport.
///
/// Handlers see it read-only through [`Context::request`](crate::Context::request).
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) body: Option<Body>,
}

impl Request {
    /// A request with no headers and an empty body. `url` is the request
    /// target: path plus optional query, no scheme or host.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            remote_addr: None,
            body: None,
        }
    }

    /// Appends a header. Repeated names are kept as separate entries.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_owned()));
        self
    }

    /// Sets an in-memory body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = Full::new(body.into())
            .map_err(|never| match never {})
            .boxed_unsync();
        self.body = Some(body);
        self
    }

    /// Sets a streaming body.
    pub fn with_body_stream(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub(crate) fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
        method: Method,
        remote_addr: SocketAddr,
    ) -> Self {
        let (parts, incoming) = req.into_parts();
        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        let headers = header_pairs(&parts.headers);
        let body = incoming.map_err(|e| Box::new(e) as BoxError).boxed_unsync();

        Self {
            method,
            url,
            headers,
            remote_addr: Some(remote_addr),
            body: Some(body),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn url(&self) -> &str { &self.url }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value sent for `name`, in arrival order.
    pub fn header_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The advertised `content-length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// The media type of `content-type`, lowercased, parameters stripped.
    pub fn media_type(&self) -> Option<String> {
        let value = self.header("content-type")?;
        let essence = value.split(';').next().unwrap_or(value).trim();
        Some(essence.to_ascii_lowercase())
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// Flattens a header map. Values that are not valid UTF-8 are kept with
/// replacement characters.
fn header_pairs(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = match value.to_str() {
                Ok(v) => v.to_owned(),
                Err(_) => {
                    debug!(header = name.as_str(), "non-UTF-8 header value decoded lossily");
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                }
            };
            (name.as_str().to_owned(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::Get, "/")
            .with_header("Content-Type", "application/json; charset=utf-8")
            .with_header("accept", "a")
            .with_header("Accept", "b");
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json; charset=utf-8"));
        assert_eq!(req.media_type().as_deref(), Some("application/json"));
        assert_eq!(req.header_all("accept").collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn content_length_parses_digits_only() {
        let ok = Request::new(Method::Post, "/").with_header("content-length", "12");
        let bad = Request::new(Method::Post, "/").with_header("content-length", "twelve");
        assert_eq!(ok.content_length(), Some(12));
        assert_eq!(bad.content_length(), None);
    }

    #[test]
    fn non_utf8_header_values_are_kept() {
        let mut headers = http::HeaderMap::new();
        headers.insert("content-type", http::HeaderValue::from_static("text/plain"));
        headers.insert("x-name", http::HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let pairs = header_pairs(&headers);

        assert!(pairs.contains(&("content-type".to_owned(), "text/plain".to_owned())));
        assert!(pairs.contains(&("x-name".to_owned(), "caf\u{fffd}".to_owned())));
    }
}
