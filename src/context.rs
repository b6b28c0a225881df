//! Per-request context.

use std::collections::HashMap;

use crate::request::{Body, Request};
use crate::response::Response;

/// A request body after a body parser has read it.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedBody {
    /// `application/json`. An empty body parses as `{}`.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`. Last occurrence of a key wins.
    Form(HashMap<String, String>),
    /// `text/plain`.
    Text(String),
    /// Any other media type, left as bytes.
    Raw(bytes::Bytes),
}

/// Everything a handler gets to work with for one request.
///
/// Created fresh by [`App::dispatch`](crate::App::dispatch) for a matched
/// route and dropped once the pipeline settles. `params`, `query` and `body`
/// are open for handlers to read and change; the inbound message itself is
/// only reachable read-only.
pub struct Context {
    request: Request,
    pathname: String,
    response: Response,
    /// Values captured by the route pattern's `:name` segments.
    pub params: HashMap<String, String>,
    /// Decoded query string. Last occurrence of a key wins.
    pub query: HashMap<String, String>,
    /// Set at most once, by the first body parser that claims the request.
    pub body: Option<ParsedBody>,
}

impl Context {
    pub(crate) fn new(
        request: Request,
        pathname: String,
        query: HashMap<String, String>,
        params: HashMap<String, String>,
        response: Response,
    ) -> Self {
        Self { request, pathname, response, params, query, body: None }
    }

    /// The inbound message.
    pub fn request(&self) -> &Request { &self.request }

    /// The URL path, without query. Percent-escapes are kept as sent.
    pub fn pathname(&self) -> &str { &self.pathname }

    /// The response handle. Clone it to keep it past the handler.
    pub fn response(&self) -> &Response { &self.response }

    /// Shorthand for `ctx.params.get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Shorthand for `ctx.query.get(name)`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Takes the raw body stream. Returns `None` once someone else took it.
    pub fn take_body_stream(&mut self) -> Option<Body> {
        self.request.body.take()
    }

    /// Replaces the raw body stream, e.g. with a length-capped wrapper.
    pub fn set_body_stream(&mut self, body: Body) {
        self.request.body = Some(body);
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("pathname", &self.pathname)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}
