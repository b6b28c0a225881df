//! Route registration and request dispatch.
//!
//! Routes live in one list, scanned in registration order. The first route
//! whose method matches and whose pattern accepts the path wins; there is
//! no priority between exact and parameterized patterns beyond that order.
//! Register `/users/new` before `/users/:id` if both should be reachable.
//!
//! [`Router`] is the builder. Freeze it with [`Router::into_app`] (the
//! server does this for you) to get the immutable [`App`] that dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{Handler, IntoHandlers};
use crate::method::Method;
use crate::path::PathPattern;
use crate::pipeline;
use crate::request::Request;
use crate::response::Response;

const DEFAULT_BASE: &str = "http://localhost";

/// A `(method, pattern, handlers)` registration.
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handlers: Vec<Handler>,
}

impl Route {
    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &str { self.pattern.as_str() }
    pub fn handlers(&self) -> &[Handler] { &self.handlers }

    /// Exact equality first, then the compiled pattern.
    fn matches(&self, pathname: &str) -> Option<HashMap<String, String>> {
        if self.pattern.matches_exactly(pathname) {
            return Some(HashMap::new());
        }
        if self.pattern.is_exact() {
            return None;
        }
        self.pattern.matches(pathname)
    }
}

// ── Router (builder) ──────────────────────────────────────────────────────────

/// The application builder.
///
/// Collects global middleware and routes. Each call returns `self` so
/// registrations chain naturally:
///
/// ```rust
/// use strand::{Handler, Router};
///
/// let ok = Handler::simple(|ctx| Box::pin(async move {
///     ctx.response().send("ok");
///     Ok(())
/// }));
///
/// let app = Router::new()
///     .get("/users/new", ok.clone())
///     .get("/users/:id", ok.clone())
///     .group("/api", |api| api.post("/items", ok))
///     .into_app();
///
/// assert_eq!(app.routes().len(), 3);
/// ```
#[derive(Default)]
pub struct Router {
    middleware: Vec<Handler>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a global middleware. Global middleware runs before the
    /// matched route's handlers, in registration order, and only for
    /// requests that matched a route.
    pub fn middleware(mut self, handler: Handler) -> Self {
        self.middleware.push(handler);
        self
    }

    /// Registers `handlers` for `method` + `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid or `handlers` is empty. Use
    /// [`try_route`](Router::try_route) to get the error instead.
    pub fn route(self, method: Method, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.try_route(method, pattern, handlers)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fallible form of [`route`](Router::route).
    pub fn try_route(
        mut self,
        method: Method,
        pattern: &str,
        handlers: impl IntoHandlers,
    ) -> Result<Self, Error> {
        let handlers = handlers.into_handlers();
        if handlers.is_empty() {
            return Err(Error::route(pattern, "a route needs at least one handler"));
        }
        let pattern = PathPattern::parse(pattern)?;
        self.routes.push(Route { method, pattern, handlers });
        Ok(self)
    }

    pub fn get(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Get, pattern, handlers)
    }

    pub fn post(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Post, pattern, handlers)
    }

    pub fn put(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Put, pattern, handlers)
    }

    pub fn patch(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Patch, pattern, handlers)
    }

    pub fn delete(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Delete, pattern, handlers)
    }

    pub fn head(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Head, pattern, handlers)
    }

    pub fn options(self, pattern: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Options, pattern, handlers)
    }

    /// Registers routes under a common prefix.
    ///
    /// `configure` receives a [`Group`] whose registration methods prepend
    /// `prefix`; the group is gone once `configure` returns.
    pub fn group(self, prefix: &str, configure: impl FnOnce(Group) -> Group) -> Self {
        configure(Group { router: self, prefix: prefix.to_owned() }).router
    }

    /// Freezes the builder into a dispatch table.
    pub fn into_app(self) -> App {
        App {
            middleware: Arc::from(self.middleware),
            routes: Arc::from(self.routes),
        }
    }
}

// ── Group ─────────────────────────────────────────────────────────────────────

/// A prefixing view over a [`Router`], handed to [`Router::group`].
pub struct Group {
    router: Router,
    prefix: String,
}

impl Group {
    /// The accumulated prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Same as [`Router::route`] with the prefix prepended.
    pub fn route(mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> Self {
        let full = format!("{}{path}", self.prefix);
        self.router = self.router.route(method, &full, handlers);
        self
    }

    pub fn get(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Get, path, handlers)
    }

    pub fn post(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Post, path, handlers)
    }

    pub fn put(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Put, path, handlers)
    }

    pub fn patch(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Patch, path, handlers)
    }

    pub fn delete(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Delete, path, handlers)
    }

    pub fn head(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Head, path, handlers)
    }

    pub fn options(self, path: &str, handlers: impl IntoHandlers) -> Self {
        self.route(Method::Options, path, handlers)
    }

    /// Nested group: prefixes compose.
    pub fn group(self, prefix: &str, configure: impl FnOnce(Group) -> Group) -> Self {
        let outer = self.prefix;
        let inner = Group { router: self.router, prefix: format!("{outer}{prefix}") };
        Self { router: configure(inner).router, prefix: outer }
    }
}

// ── App (frozen) ──────────────────────────────────────────────────────────────

/// The immutable dispatch table produced by [`Router::into_app`].
///
/// Cloning shares the tables.
#[derive(Clone)]
pub struct App {
    middleware: Arc<[Handler]>,
    routes: Arc<[Route]>,
}

impl App {
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn middleware(&self) -> &[Handler] {
        &self.middleware
    }

    /// Handles one request, writing the outcome to `response`.
    ///
    /// Never fails: unmatched routes get `404`, handler faults `500`. The
    /// only way for the response to stay unanswered is a chain that stalls.
    pub async fn dispatch(&self, request: Request, response: Response) {
        let Some(url) = parse_url(&request) else {
            response.status(400).text("Bad Request");
            return;
        };
        let pathname = url.path().to_owned();

        let Some((route, params)) = self.resolve(request.method(), &pathname) else {
            debug!(method = %request.method(), path = %pathname, "no route matched");
            response.status(404).text("Not Found");
            return;
        };

        let query = url.query_pairs().into_owned().collect();
        let chain: Vec<Handler> = self.middleware.iter()
            .chain(route.handlers.iter())
            .cloned()
            .collect();

        let mut ctx = Context::new(request, pathname, query, params, response);
        pipeline::run(&chain, 0, &mut ctx).await;
    }

    fn resolve(&self, method: Method, pathname: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes.iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.matches(pathname).map(|params| (route, params)))
    }
}

/// Resolves the request target against the `host` header, falling back to
/// a default base when the header is absent or unusable.
fn parse_url(request: &Request) -> Option<Url> {
    let base = request.header("host")
        .and_then(|host| Url::parse(&format!("http://{host}")).ok())
        .or_else(|| Url::parse(DEFAULT_BASE).ok())?;
    base.join(request.url()).ok()
}
